//! End-to-end tests of the ingest and answer pipelines over the in-memory
//! store, with a deterministic embedder and a recording generator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use docqa_core::answer::answer_question;
use docqa_core::chunk::TextSplitter;
use docqa_core::embedding::Embedder;
use docqa_core::generation::Generator;
use docqa_core::ingest::{index_documents, DEFAULT_UPSERT_BATCH_SIZE};
use docqa_core::models::Document;
use docqa_core::store::memory::InMemoryVectorStore;
use docqa_core::store::{IndexSpec, Metric, VectorStore};

/// Embeds text by its first character: `a`, `b`, `c` map to unit axes,
/// everything else to the diagonal.
#[derive(Default)]
struct LetterEmbedder {
    calls: AtomicUsize,
    inputs: AtomicUsize,
}

fn letter_vector(text: &str) -> Vec<f32> {
    match text.chars().next() {
        Some('a') => vec![1.0, 0.0, 0.0],
        Some('b') => vec![0.0, 1.0, 0.0],
        Some('c') => vec![0.0, 0.0, 1.0],
        _ => vec![1.0, 1.0, 1.0],
    }
}

#[async_trait]
impl Embedder for LetterEmbedder {
    fn model_name(&self) -> &str {
        "letters"
    }
    fn dims(&self) -> usize {
        3
    }
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| letter_vector(t)).collect())
    }
}

#[derive(Default)]
struct RecordingGenerator {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model_name(&self) -> &str {
        "recorder"
    }
    async fn generate(&self, context: &str, question: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((context.to_string(), question.to_string()));
        Ok(format!("answer to {}", question))
    }
}

async fn store_with_index(name: &str) -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new();
    store
        .create_index(&IndexSpec {
            name: name.to_string(),
            dimension: 3,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-west-2".to_string(),
        })
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_single_document_end_to_end() {
    let store = store_with_index("docs").await;
    let index = store.index("docs").await.unwrap();
    let embedder = LetterEmbedder::default();
    let generator = RecordingGenerator::default();

    let text = format!("{}{}{}", "a".repeat(1000), "b".repeat(1000), "c".repeat(500));
    assert_eq!(text.len(), 2500);
    let docs = vec![Document::new("letters.txt", text)];

    let stats = index_documents(
        index.as_ref(),
        &embedder,
        &TextSplitter::default(),
        &docs,
        DEFAULT_UPSERT_BATCH_SIZE,
    )
    .await
    .unwrap();

    assert_eq!(stats.chunks, 3);
    assert_eq!(stats.embeddings, 3);
    assert_eq!(stats.upsert_batches, 1);
    assert_eq!(stats.vectors_upserted, 3);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

    let mem = store.memory_index("docs").unwrap();
    assert_eq!(mem.batch_sizes(), vec![3]);
    assert_eq!(
        mem.ids(),
        vec!["letters.txt-0", "letters.txt-1", "letters.txt-2"]
    );

    let answer = answer_question(index.as_ref(), &embedder, &generator, "b?", 10)
        .await
        .unwrap();
    assert_eq!(answer.as_deref(), Some("answer to b?"));

    let calls = generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (context, question) = &calls[0];
    assert_eq!(question, "b?");
    assert!(context.starts_with(&"b".repeat(1000)), "closest chunk must lead the context");
}

#[tokio::test]
async fn test_empty_index_yields_no_answer() {
    let store = store_with_index("empty").await;
    let index = store.index("empty").await.unwrap();
    let embedder = LetterEmbedder::default();
    let generator = RecordingGenerator::default();

    let answer = answer_question(index.as_ref(), &embedder, &generator, "anything", 10)
        .await
        .unwrap();
    assert!(answer.is_none());
    assert!(generator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_batch_rejected_before_upsert() {
    let store = store_with_index("capped").await;
    let index = store.index("capped").await.unwrap();
    let embedder = LetterEmbedder::default();
    let docs = vec![Document::new("a.txt", "a".repeat(50))];
    let splitter = TextSplitter::new(10, 0).unwrap();

    let err = index_documents(index.as_ref(), &embedder, &splitter, &docs, 101)
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("[1, 100]"));
    assert!(store.memory_index("capped").unwrap().is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batches_never_exceed_limit() {
    let store = store_with_index("big").await;
    let index = store.index("big").await.unwrap();
    let embedder = LetterEmbedder::default();

    // 250 chunks of 10 chars each.
    let text = "x".repeat(2500);
    let docs = vec![Document::new("big.txt", text)];
    let splitter = TextSplitter::new(10, 0).unwrap();

    let stats = index_documents(index.as_ref(), &embedder, &splitter, &docs, 100)
        .await
        .unwrap();

    let mem = store.memory_index("big").unwrap();
    assert_eq!(mem.batch_sizes(), vec![100, 100, 50]);
    assert_eq!(stats.chunks, 250);
    assert_eq!(stats.vectors_upserted, 250);
    assert_eq!(mem.len(), 250);
    assert_eq!(embedder.inputs.load(Ordering::SeqCst), 250);
    // One embedding call per document, regardless of chunk count.
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_multiple_documents_and_empty_ones() {
    let store = store_with_index("multi").await;
    let index = store.index("multi").await.unwrap();
    let embedder = LetterEmbedder::default();

    let docs = vec![
        Document::new("one.md", "x".repeat(1500)),
        Document::new("blank.md", "   \n\n  "),
        Document::new("two.md", "y".repeat(3001)),
    ];
    let stats = index_documents(
        index.as_ref(),
        &embedder,
        &TextSplitter::default(),
        &docs,
        DEFAULT_UPSERT_BATCH_SIZE,
    )
    .await
    .unwrap();

    // ceil(1500/1000) + 0 + ceil(3001/1000)
    assert_eq!(stats.chunks, 2 + 4);
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.skipped_empty, 1);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

    let ids = store.memory_index("multi").unwrap().ids();
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids.contains(&"two.md-3".to_string()));
}

#[tokio::test]
async fn test_upsert_failure_aborts_run() {
    let store = InMemoryVectorStore::new();
    store
        .create_index(&IndexSpec {
            name: "narrow".to_string(),
            dimension: 2,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-west-2".to_string(),
        })
        .await
        .unwrap();
    let index = store.index("narrow").await.unwrap();

    let docs = vec![
        Document::new("first.txt", "abc"),
        Document::new("second.txt", "def"),
    ];
    let err = index_documents(
        index.as_ref(),
        &LetterEmbedder::default(),
        &TextSplitter::default(),
        &docs,
        DEFAULT_UPSERT_BATCH_SIZE,
    )
    .await
    .unwrap_err();

    assert!(format!("{:#}", err).contains("first.txt"));
    assert!(store.memory_index("narrow").unwrap().is_empty());
}
