//! Backend wiring.
//!
//! [`Services`] bundles the vector store, embedder and generator behind
//! their traits so the CLI, the server and the tests share one code path.

use std::sync::Arc;

use anyhow::Result;

use docqa_core::embedding::Embedder;
use docqa_core::generation::Generator;
use docqa_core::store::memory::InMemoryVectorStore;
use docqa_core::store::VectorStore;

use crate::config::{Config, StoreProvider};
use crate::embedding::OpenAIEmbedder;
use crate::generation::OpenAIGenerator;
use crate::pinecone::PineconeStore;

#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

impl Services {
    /// Builds the real clients. API keys come from the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn VectorStore> = match config.store.provider {
            StoreProvider::Pinecone => Arc::new(PineconeStore::new(&config.store)?),
            StoreProvider::Memory => Arc::new(InMemoryVectorStore::new()),
        };
        let dims = config.embedding.effective_dims(&config.index);
        let embedder = Arc::new(OpenAIEmbedder::new(&config.embedding, dims)?);
        let generator = Arc::new(OpenAIGenerator::new(&config.generation)?);

        tracing::debug!(
            store = ?config.store.provider,
            embedding_model = %config.embedding.model,
            generation_model = %config.generation.model,
            "services ready"
        );

        Ok(Self {
            store,
            embedder,
            generator,
        })
    }
}
