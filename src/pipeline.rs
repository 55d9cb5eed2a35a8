//! Setup and ask flows shared by the CLI and the HTTP server.

use anyhow::{Context, Result};
use serde::Serialize;

use docqa_core::answer::answer_question;
use docqa_core::chunk::TextSplitter;
use docqa_core::ingest::{index_documents, IngestStats};

use crate::config::Config;
use crate::loader::load_documents;
use crate::provision::{ensure_index, IndexStatus};
use crate::services::Services;

/// Outcome of one setup run.
#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub index: String,
    pub index_status: IndexStatus,
    pub stats: IngestStats,
}

/// Loads the documents directory, ensures the index exists, then chunks,
/// embeds and upserts everything.
///
/// Documents are loaded first, on the blocking pool, so a bad documents root
/// fails before anything is created in the store.
pub async fn run_setup(config: &Config, services: &Services) -> Result<SetupReport> {
    let documents_config = config.documents.clone();
    let documents = tokio::task::spawn_blocking(move || load_documents(&documents_config))
        .await
        .context("document loading task failed")??;

    let index_status = ensure_index(services.store.as_ref(), &config.index)
        .await
        .with_context(|| format!("provisioning index {}", config.index.name))?;

    let index = services.store.index(&config.index.name).await?;
    let splitter = TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;

    let stats = index_documents(
        index.as_ref(),
        services.embedder.as_ref(),
        &splitter,
        &documents,
        config.index.upsert_batch_size,
    )
    .await?;

    Ok(SetupReport {
        index: config.index.name.clone(),
        index_status,
        stats,
    })
}

/// Answers one question against the configured index. `None` means the
/// index returned no matches.
pub async fn run_ask(config: &Config, services: &Services, question: &str) -> Result<Option<String>> {
    let index = services.store.index(&config.index.name).await?;
    answer_question(
        index.as_ref(),
        services.embedder.as_ref(),
        services.generator.as_ref(),
        question,
        config.retrieval.top_k,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use async_trait::async_trait;
    use docqa_core::embedding::Embedder;
    use docqa_core::generation::Generator;
    use docqa_core::store::memory::InMemoryVectorStore;
    use tempfile::TempDir;

    struct ConstEmbedder;

    #[async_trait]
    impl Embedder for ConstEmbedder {
        fn model_name(&self) -> &str {
            "const"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn model_name(&self) -> &str {
            "echo"
        }
        async fn generate(&self, context: &str, _question: &str) -> Result<String> {
            Ok(format!("ctx:{}", context))
        }
    }

    fn setup(root: &std::path::Path) -> (Config, Services, Arc<InMemoryVectorStore>) {
        let mut config = Config::default();
        config.index.dimension = 2;
        config.index.ready_poll_ms = 1;
        config.documents.root = root.to_path_buf();
        let store = Arc::new(InMemoryVectorStore::new());
        let services = Services {
            store: store.clone(),
            embedder: Arc::new(ConstEmbedder),
            generator: Arc::new(EchoGenerator),
        };
        (config, services, store)
    }

    #[tokio::test]
    async fn setup_then_ask() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("note.txt"), "the sky is blue").unwrap();
        let (config, services, store) = setup(tmp.path());

        let report = run_setup(&config, &services).await.unwrap();
        assert_eq!(report.index_status, IndexStatus::Created);
        assert_eq!(report.stats.chunks, 1);
        assert_eq!(store.memory_index("docqa").unwrap().ids(), vec!["note.txt-0"]);

        let answer = run_ask(&config, &services, "what colour?").await.unwrap();
        assert_eq!(answer.as_deref(), Some("ctx:the sky is blue"));
    }

    #[tokio::test]
    async fn second_setup_reuses_index() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.md"), "alpha").unwrap();
        let (config, services, store) = setup(tmp.path());

        run_setup(&config, &services).await.unwrap();
        let again = run_setup(&config, &services).await.unwrap();

        assert_eq!(again.index_status, IndexStatus::AlreadyExists);
        assert_eq!(store.create_calls(), 1);
        assert_eq!(store.memory_index("docqa").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_root_fails_before_provisioning() {
        let tmp = TempDir::new().unwrap();
        let (config, services, store) = setup(&tmp.path().join("missing"));

        assert!(run_setup(&config, &services).await.is_err());
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn setup_loads_nested_documents_on_current_thread_runtime() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/one.md"), "first").unwrap();
        fs::write(tmp.path().join("two.txt"), "second").unwrap();
        let (config, services, store) = setup(tmp.path());

        let report = run_setup(&config, &services).await.unwrap();

        assert_eq!(report.stats.documents, 2);
        assert_eq!(
            store.memory_index("docqa").unwrap().ids(),
            vec!["nested/one.md-0", "two.txt-0"]
        );
    }

    #[tokio::test]
    async fn ask_without_index_is_error() {
        let tmp = TempDir::new().unwrap();
        let (config, services, _store) = setup(tmp.path());
        assert!(run_ask(&config, &services, "q").await.is_err());
    }
}
