//! HTTP API tests against an in-process server backed by the in-memory
//! store, a deterministic embedder and a recording generator.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use docqa::config::{parse_config, Config};
use docqa::server::run_server_with_services;
use docqa::services::Services;
use docqa_core::embedding::Embedder;
use docqa_core::generation::Generator;
use docqa_core::store::memory::InMemoryVectorStore;

// ─── Fakes ──────────────────────────────────────────────────────────

/// Embeds text by counting the letters `x`, `y` and `z`.
struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }

    fn dims(&self) -> usize {
        3
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let count = |c: char| t.chars().filter(|&x| x == c).count() as f32;
                vec![count('x') + 0.01, count('y') + 0.01, count('z') + 0.01]
            })
            .collect())
    }
}

#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recording"
    }

    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((context.to_string(), question.to_string()));
        Ok(format!("answer to: {}", question))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config(docs_root: &Path, port: u16) -> Config {
    let content = format!(
        r#"[index]
name = "server-test"
dimension = 3
ready_poll_ms = 1

[documents]
root = "{}"

[store]
provider = "memory"

[server]
bind = "127.0.0.1:{}"
"#,
        docs_root.display(),
        port
    );
    parse_config(&content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

struct TestServer {
    base: String,
    store: Arc<InMemoryVectorStore>,
    generator: Arc<RecordingGenerator>,
    _tmp: TempDir,
}

/// Starts a server over a temp documents directory holding `files`.
async fn start_server(files: &[(&str, &str)]) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let docs = tmp.path().join("documents");
    fs::create_dir_all(&docs).unwrap();
    for (name, body) in files {
        fs::write(docs.join(name), body).unwrap();
    }
    start_server_at(tmp, &docs).await
}

async fn start_server_at(tmp: TempDir, docs: &Path) -> TestServer {
    let port = find_free_port();
    let cfg = test_config(docs, port);

    let store = Arc::new(InMemoryVectorStore::new());
    let generator = Arc::new(RecordingGenerator::default());
    let services = Services {
        store: store.clone(),
        embedder: Arc::new(LetterEmbedder),
        generator: generator.clone(),
    };

    tokio::spawn(async move {
        run_server_with_services(&cfg, services).await.unwrap();
    });
    wait_for_server(port).await;

    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        store,
        generator,
        _tmp: tmp,
    }
}

async fn post_json(url: &str, body: &Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_and_index_page() {
    let server = start_server(&[]).await;

    let health: Value = reqwest::get(format!("{}/health", server.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let page = reqwest::get(format!("{}/", server.base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Ask AI"));
    assert!(page.contains("Create Index and Embeddings"));
}

#[tokio::test]
async fn test_setup_then_read_answers_from_context() {
    let server = start_server(&[
        ("xray.txt", "xxxx xxxx about x-rays"),
        ("zebra.md", "zzzz zebras graze"),
    ])
    .await;

    let (status, body) = post_json(&format!("{}/api/setup", server.base), &Value::Null).await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"],
        "Successfully created index and loaded data into pinecone."
    );

    let index = server.store.memory_index("server-test").unwrap();
    assert_eq!(index.ids(), vec!["xray.txt-0", "zebra.md-0"]);

    let (status, body) = post_json(
        &format!("{}/api/read", server.base),
        &Value::String("tell me about zzz".into()),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], "answer to: tell me about zzz");

    let calls = server.generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    // Best match first, every match included.
    assert!(calls[0].0.starts_with("zzzz zebras graze"));
    assert!(calls[0].0.contains("xxxx xxxx about x-rays"));
}

#[tokio::test]
async fn test_setup_is_idempotent() {
    let server = start_server(&[("a.txt", "xyz")]).await;
    let url = format!("{}/api/setup", server.base);

    let (first, _) = post_json(&url, &Value::Null).await;
    let (second, _) = post_json(&url, &Value::Null).await;

    assert_eq!(first, 200);
    assert_eq!(second, 200);
    assert_eq!(server.store.create_calls(), 1);
    assert_eq!(server.store.memory_index("server-test").unwrap().len(), 1);
}

#[tokio::test]
async fn test_read_object_body() {
    let server = start_server(&[("a.txt", "yyy")]).await;
    post_json(&format!("{}/api/setup", server.base), &Value::Null).await;

    let (status, body) = post_json(
        &format!("{}/api/read", server.base),
        &serde_json::json!({"question": "why?"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], "answer to: why?");
}

#[tokio::test]
async fn test_read_empty_index_returns_null() {
    // Only blank documents: the index is created but stays empty.
    let server = start_server(&[("blank.txt", "   \n\n  ")]).await;
    let (status, _) = post_json(&format!("{}/api/setup", server.base), &Value::Null).await;
    assert_eq!(status, 200);

    let (status, body) = post_json(
        &format!("{}/api/read", server.base),
        &Value::String("anything?".into()),
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["data"].is_null());
    assert!(server.generator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_read_empty_question_is_bad_request() {
    let server = start_server(&[]).await;
    let (status, body) = post_json(
        &format!("{}/api/read", server.base),
        &Value::String("   ".into()),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_read_before_setup_is_upstream_error() {
    let server = start_server(&[("a.txt", "x")]).await;
    let (status, body) = post_json(
        &format!("{}/api/read", server.base),
        &Value::String("q".into()),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn test_setup_missing_documents_dir_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("no-such-dir");
    let server = start_server_at(tmp, &missing).await;

    let (status, body) = post_json(&format!("{}/api/setup", server.base), &Value::Null).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "setup_failed");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("does not exist"));
    assert_eq!(server.store.create_calls(), 0);
}
