//! Pinecone backend against a mocked REST API.
#![cfg(feature = "pinecone")]

use std::sync::Arc;

use flowparts_rag::pinecone::PineconeVectorStore;
use flowparts_rag::{
    Chunk, Document, DocumentRetriever, DocumentStore, InMemoryDocumentStore, Metadata,
    MetadataFilters, RagError, VectorStore,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "pc-test";

fn chunk(id: &str, document_id: &str, text: &str) -> Chunk {
    let mut metadata = Metadata::new();
    metadata.insert("document_id".into(), json!(document_id));
    metadata.insert("client".into(), json!("Acme"));
    metadata.insert("nested".into(), json!({"a": 1}));
    metadata.insert("dropped".into(), json!(null));
    Chunk {
        id: id.into(),
        text: text.into(),
        embedding: vec![0.1, 0.2, 0.3],
        metadata,
        document_id: document_id.into(),
    }
}

#[tokio::test]
async fn resolves_host_and_dimensions_from_control_plane() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/quickstart"))
        .and(header("Api-Key", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "quickstart",
            "dimension": 1536,
            "host": server.uri(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store =
        PineconeVectorStore::connect_with_control_plane(KEY, "quickstart", &server.uri())
            .await
            .unwrap();
    assert_eq!(store.dimensions(), 1536);
}

#[tokio::test]
async fn unknown_index_is_a_remote_call_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("index not found"))
        .mount(&server)
        .await;

    let err = PineconeVectorStore::connect_with_control_plane(KEY, "missing", &server.uri())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, RagError::RemoteCall { .. }));
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn upsert_sends_text_and_sanitized_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("X-Pinecone-API-Version", "2024-07"))
        .and(body_partial_json(json!({
            "namespace": "clients",
            "vectors": [{
                "id": "doc1_0",
                "metadata": {
                    "_node_text": "hello world",
                    "document_id": "doc1",
                    "client": "Acme",
                    "nested": "{\"a\":1}",
                },
            }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let store = PineconeVectorStore::from_host(KEY, &server.uri(), 3).unwrap();
    store.upsert("clients", &[chunk("doc1_0", "doc1", "hello world")]).await.unwrap();
}

#[tokio::test]
async fn upsert_is_split_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 100})))
        .expect(3)
        .mount(&server)
        .await;

    let store = PineconeVectorStore::from_host(KEY, &server.uri(), 3).unwrap();
    let chunks: Vec<Chunk> =
        (0..250).map(|i| chunk(&format!("doc1_{i}"), "doc1", "body")).collect();
    store.upsert("clients", &chunks).await.unwrap();
}

#[tokio::test]
async fn get_nodes_sends_filter_and_rebuilds_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "namespace": "clients",
            "filter": {"document_id": {"$eq": "doc1"}},
            "includeMetadata": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{
                "id": "doc1_0",
                "score": 0.9,
                "values": [0.1, 0.2, 0.3],
                "metadata": {
                    "_node_text": "hello world",
                    "document_id": "doc1",
                    "client": "Acme",
                },
            }],
        })))
        .mount(&server)
        .await;

    let store = PineconeVectorStore::from_host(KEY, &server.uri(), 3).unwrap();
    let nodes =
        store.get_nodes("clients", &MetadataFilters::for_document("doc1"), 10).await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].text, "hello world");
    assert_eq!(nodes[0].document_id, "doc1");
    assert!(!nodes[0].metadata.contains_key("_node_text"));
}

#[tokio::test]
async fn large_limits_are_clamped_to_the_metadata_top_k_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({
            "topK": 1000,
            "includeMetadata": true,
            "includeValues": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .expect(1)
        .mount(&server)
        .await;

    let store = PineconeVectorStore::from_host(KEY, &server.uri(), 3).unwrap();
    let nodes =
        store.get_nodes("clients", &MetadataFilters::for_document("doc1"), 5000).await.unwrap();
    assert!(nodes.is_empty());
}

#[tokio::test]
async fn retrieval_follows_pinecone_node_into_document_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [{
                "id": "doc1_0",
                "metadata": {"_node_text": "hello", "document_id": "doc1"},
            }],
        })))
        .mount(&server)
        .await;

    let documents = Arc::new(InMemoryDocumentStore::new());
    documents.put(&Document::new("doc1", "hello world")).await.unwrap();
    let store = PineconeVectorStore::from_host(KEY, &server.uri(), 3).unwrap();

    let retriever = DocumentRetriever::new(Arc::new(store), documents);
    assert_eq!(retriever.retrieve("clients", "doc1").await.unwrap(), "hello world");
}

#[tokio::test]
async fn server_errors_surface_as_remote_call_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = PineconeVectorStore::from_host(KEY, &server.uri(), 3).unwrap();
    let err = store
        .get_nodes("clients", &MetadataFilters::for_document("doc1"), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::RemoteCall { .. }));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn empty_key_is_rejected() {
    assert!(matches!(
        PineconeVectorStore::from_host("", "localhost", 3),
        Err(RagError::Config(_))
    ));
}

#[cfg(feature = "postgres")]
#[tokio::test]
async fn retriever_connects_without_embedding_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexes/quickstart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "quickstart",
            "dimension": 8,
            "host": server.uri(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"matches": []})))
        .mount(&server)
        .await;

    let credentials = flowparts_rag::Credentials {
        pinecone_api_key: Some(KEY.into()),
        docstore_url: Some("postgres://reader:pw@127.0.0.1:1/docs".into()),
        pinecone_control_plane_url: Some(server.uri()),
        ..flowparts_rag::Credentials::default()
    };
    let retriever = DocumentRetriever::connect(&credentials, "quickstart").await.unwrap();
    assert!(matches!(
        retriever.retrieve("clients", "doc1").await,
        Err(RagError::NotFound { what: "chunk", .. })
    ));
}
