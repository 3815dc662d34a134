use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flowparts_rag::{
    ChunkingStrategy, Credentials, FileInput, IngestComponent, IngestInput, RagConfig,
    RetrieveInput, RetrieverComponent,
};
use tracing::debug;

#[derive(Parser)]
#[command(name = "flowparts")]
#[command(about = "Index documents into a vector store and retrieve them by key")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Backend selection and credentials. Unset credentials fall back to the
/// `PINECONE_API_KEY`, `OPENAI_API_KEY` and `DOCSTORE_URL` environment variables.
#[derive(Args)]
struct BackendArgs {
    /// Name of the Pinecone index
    #[arg(long, global = true, default_value = "")]
    index: String,
    /// Namespace inside the index
    #[arg(long, global = true, default_value = "")]
    namespace: String,
    #[arg(long, global = true)]
    pinecone_api_key: Option<String>,
    #[arg(long, global = true)]
    openai_api_key: Option<String>,
    /// Postgres URL of the document store
    #[arg(long, global = true)]
    docstore_url: Option<String>,
    /// Pinecone control-plane endpoint used to look up the index host
    #[arg(long, global = true)]
    pinecone_control_plane_url: Option<String>,
    /// Per-request timeout for HTTP backends, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, validate and index files, printing the result table as JSON
    Ingest {
        /// Metadata applied to every file, as a JSON object
        #[arg(long)]
        metadata: String,
        /// Document key to use for the first file
        #[arg(long)]
        id: Option<String>,
        /// Split documents into chunks of this many characters
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Characters shared between consecutive chunks
        #[arg(long, default_value_t = 0, requires = "chunk_size")]
        chunk_overlap: usize,
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the text of the document stored under a key
    Retrieve {
        /// The document key
        file_id: String,
    },
}

impl BackendArgs {
    fn credentials(&self) -> Credentials {
        let env = Credentials::from_env();
        Credentials {
            pinecone_api_key: self.pinecone_api_key.clone().or(env.pinecone_api_key),
            openai_api_key: self.openai_api_key.clone().or(env.openai_api_key),
            docstore_url: self.docstore_url.clone().or(env.docstore_url),
            pinecone_control_plane_url: self
                .pinecone_control_plane_url
                .clone()
                .or(env.pinecone_control_plane_url),
            request_timeout: self.timeout_secs.map(Duration::from_secs).or(env.request_timeout),
        }
    }

    fn index_name(&self) -> anyhow::Result<&str> {
        anyhow::ensure!(!self.index.is_empty(), "--index is required");
        Ok(&self.index)
    }
}

fn ingest_input(
    metadata: &str,
    id: Option<String>,
    files: Vec<PathBuf>,
    namespace: String,
) -> anyhow::Result<IngestInput> {
    let metadata = serde_json::from_str(metadata).context("--metadata is not valid JSON")?;
    let mut files: Vec<FileInput> = files.into_iter().map(FileInput::from).collect();
    if let (Some(id), Some(first)) = (id, files.first_mut()) {
        first.id = Some(id);
    }
    Ok(IngestInput { files, metadata, namespace })
}

fn rag_config(chunk_size: Option<usize>, chunk_overlap: usize) -> anyhow::Result<RagConfig> {
    let mut builder = RagConfig::builder();
    if let Some(size) = chunk_size {
        builder = builder.chunking(ChunkingStrategy::FixedSize { size, overlap: chunk_overlap });
    }
    Ok(builder.build()?)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Ingest { metadata, id, chunk_size, chunk_overlap, files } => {
            let input = ingest_input(&metadata, id, files, cli.backend.namespace.clone())?;
            let config = rag_config(chunk_size, chunk_overlap)?;
            let index = cli.backend.index_name()?;
            let credentials = cli.backend.credentials();
            debug!(?credentials, index, "connecting ingestion backends");
            let component = IngestComponent::connect(&credentials, index, config).await?;
            let table = component.run(input).await?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
        Commands::Retrieve { file_id } => {
            let index = cli.backend.index_name()?;
            let credentials = cli.backend.credentials();
            debug!(?credentials, index, "connecting retrieval backends");
            let component = RetrieverComponent::connect(&credentials, index).await?;
            let input = RetrieveInput { file_id, namespace: cli.backend.namespace.clone() };
            let text = component.run(input).await?;
            println!("{text}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn retrieve_args(control_plane: &str) -> Cli {
        Cli::try_parse_from([
            "flowparts",
            "retrieve",
            "doc1",
            "--index",
            "idx",
            "--pinecone-api-key",
            "pc-test",
            "--docstore-url",
            "postgres://reader:pw@127.0.0.1:1/docs",
            "--pinecone-control-plane-url",
            control_plane,
        ])
        .unwrap()
    }

    #[test]
    fn parses_ingest_with_global_flags() {
        let cli = Cli::try_parse_from([
            "flowparts",
            "--index",
            "quickstart",
            "ingest",
            "--namespace",
            "clients",
            "--metadata",
            "{}",
            "a.txt",
            "b.txt",
        ])
        .unwrap();
        assert_eq!(cli.backend.index, "quickstart");
        assert_eq!(cli.backend.namespace, "clients");
        let Commands::Ingest { files, chunk_size, .. } = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(chunk_size, None);
    }

    #[test]
    fn ingest_requires_files() {
        let cli = Cli::try_parse_from(["flowparts", "ingest", "--metadata", "{}"]);
        assert!(cli.is_err());
    }

    #[test]
    fn overlap_requires_chunk_size() {
        let cli = Cli::try_parse_from([
            "flowparts",
            "ingest",
            "--metadata",
            "{}",
            "--chunk-overlap",
            "4",
            "a.txt",
        ]);
        assert!(cli.is_err());
    }

    #[test]
    fn parses_retrieve() {
        let cli = Cli::try_parse_from(["flowparts", "retrieve", "doc1", "--index", "idx"]).unwrap();
        let Commands::Retrieve { file_id } = cli.command else {
            panic!("expected retrieve");
        };
        assert_eq!(file_id, "doc1");
        assert_eq!(cli.backend.index, "idx");
    }

    #[test]
    fn builds_ingest_input() {
        let input = ingest_input(
            r#"{"source": "email", "tag": ["x"]}"#,
            Some("doc1".into()),
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")],
            "clients".into(),
        )
        .unwrap();
        assert_eq!(input.metadata, json!({"source": "email", "tag": ["x"]}));
        assert_eq!(input.files[0].id.as_deref(), Some("doc1"));
        assert_eq!(input.files[1].id, None);
        assert_eq!(input.namespace, "clients");
    }

    #[test]
    fn rejects_malformed_metadata() {
        let files = vec![PathBuf::from("a.txt")];
        assert!(ingest_input("{not json", None, files, String::new()).is_err());
    }

    #[test]
    fn chunking_flags_are_validated() {
        assert_eq!(rag_config(None, 0).unwrap().chunking, ChunkingStrategy::WholeDocument);
        assert!(rag_config(Some(10), 10).is_err());
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::try_parse_from([
            "flowparts",
            "--pinecone-api-key",
            "pc-flag",
            "--timeout-secs",
            "5",
            "retrieve",
            "doc1",
        ])
        .unwrap();
        let credentials = cli.backend.credentials();
        assert_eq!(credentials.pinecone_api_key.as_deref(), Some("pc-flag"));
        assert_eq!(credentials.request_timeout, Some(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn retrieve_needs_no_embedding_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/idx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "idx",
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

        let err = run(retrieve_args(&server.uri())).await.unwrap_err();
        assert_eq!(err.to_string(), "Error retrieving document: No chunk found for key 'doc1'");
    }

    #[tokio::test]
    async fn retrieve_setup_errors_carry_the_component_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/idx"))
            .respond_with(ResponseTemplate::new(404).set_body_string("index not found"))
            .mount(&server)
            .await;

        let err = run(retrieve_args(&server.uri())).await.unwrap_err();
        assert!(err.to_string().starts_with("Error retrieving document: "));
        assert!(err.to_string().contains("idx"));
    }

    #[tokio::test]
    async fn missing_index_is_rejected_before_connecting() {
        let cli = Cli::try_parse_from(["flowparts", "retrieve", "doc1"]).unwrap();
        let err = run(cli).await.unwrap_err();
        assert_eq!(err.to_string(), "--index is required");
    }
}
