#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! End-to-end indexing against a mocked Ollama server and the in-memory store

use std::io::Write;

use semantic_chunks::IndexError;
use semantic_chunks::commands::{load_config, search_records};
use semantic_chunks::config::OllamaConfig;
use semantic_chunks::database::{MemoryStore, VectorStore};
use semantic_chunks::embeddings::{ChunkingConfig, OllamaClient};
use semantic_chunks::extractor::TextSource;
use semantic_chunks::indexer::Indexer;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const LETTERS: usize = 26;

const DOCUMENT: &str = "Postgres stores the records. Each record keeps its text. \
    The embedding column has a fixed width. Queries are embedded the same way. \
    Nearest records come back first.";

/// Embeds each input as its normalised letter histogram
struct LetterHistogram;

impl Respond for LetterHistogram {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body is json");
        let inputs = body["input"].as_array().expect("input is an array");

        let embeddings: Vec<Vec<f32>> = inputs
            .iter()
            .map(|text| histogram(text.as_str().unwrap_or_default()))
            .collect();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "embeddings": embeddings }))
    }
}

fn histogram(text: &str) -> Vec<f32> {
    let mut counts = vec![0.0_f32; LETTERS];
    for c in text.chars().filter(char::is_ascii_alphabetic) {
        let index = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        counts[index] += 1.0;
    }
    let norm = counts.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        counts.iter_mut().for_each(|v| *v /= norm);
    }
    counts
}

async fn mock_ollama() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(LetterHistogram)
        .mount(&server)
        .await;
    server
}

fn client_for(server: &MockServer) -> OllamaClient {
    let config = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: server.address().port(),
        embedding_dimension: LETTERS as u32,
        ..OllamaConfig::default()
    };
    OllamaClient::new(&config).expect("Failed to create client")
}

#[tokio::test]
async fn index_and_query_literal_text() {
    let server = mock_ollama().await;
    let indexer = Indexer::new(client_for(&server), MemoryStore::new(LETTERS));
    indexer.ensure_schema().await.expect("ensure_schema");

    let count = indexer
        .index(&TextSource::Literal(DOCUMENT.to_string()))
        .await
        .expect("index");
    assert_eq!(count, 2);

    let first_chunk = "Postgres stores the records. Each record keeps its text. \
                       The embedding column has a fixed width.";
    let hits = indexer
        .query_with_scores(first_chunk, 2)
        .await
        .expect("query");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].content, first_chunk);
    assert!(hits[0].distance < 1e-6);
    assert!(hits[1].distance > hits[0].distance);

    indexer.close().await;
}

#[tokio::test]
async fn inserted_documents_are_not_chunked() {
    let server = mock_ollama().await;
    let indexer = Indexer::new(client_for(&server), MemoryStore::new(LETTERS))
        .with_chunking(ChunkingConfig {
            sentences_per_chunk: 1,
        });
    indexer.ensure_schema().await.expect("ensure_schema");

    indexer.insert_document(DOCUMENT).await.expect("insert");

    assert_eq!(indexer.store().count().await.expect("count"), 1);
    let texts = indexer.query(DOCUMENT, 3).await.expect("query");
    assert_eq!(texts, vec![DOCUMENT]);
}

#[tokio::test]
async fn search_on_fresh_store_is_empty() {
    let server = mock_ollama().await;
    let indexer = Indexer::new(client_for(&server), MemoryStore::new(LETTERS));

    let hits = search_records(&indexer, "anything at all", 3)
        .await
        .expect("search on a fresh store succeeds");

    assert!(hits.is_empty());
    assert_eq!(indexer.store().count().await.expect("count"), 0);
}

#[tokio::test]
async fn unreachable_embedder_stores_nothing() {
    let config = OllamaConfig {
        host: "127.0.0.1".to_string(),
        port: {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
            listener.local_addr().expect("local address").port()
        },
        embedding_dimension: LETTERS as u32,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");
    let indexer = Indexer::new(client, MemoryStore::new(LETTERS));
    indexer.ensure_schema().await.expect("ensure_schema");

    let result = indexer.index_text(DOCUMENT).await;

    assert!(matches!(result, Err(IndexError::Connectivity(_))));
    assert_eq!(indexer.store().count().await.expect("count"), 0);
}

#[test]
fn config_dir_drives_chunking_and_search() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut file = std::fs::File::create(temp_dir.path().join("config.toml"))
        .expect("Failed to create config file");
    writeln!(
        file,
        "[chunking]\nsentences_per_chunk = 2\n\n[search]\ntop_k = 7\n\n[database]\ntable = \"papers\""
    )
    .expect("Failed to write config file");

    let config = load_config(Some(temp_dir.path())).expect("config loads");

    assert_eq!(config.chunking.sentences_per_chunk, 2);
    assert_eq!(config.search.top_k, 7);
    assert_eq!(config.database.table, "papers");
    assert_eq!(config.get_base_dir(), temp_dir.path());
}
