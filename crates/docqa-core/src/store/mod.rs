//! Vector store abstraction.
//!
//! [`VectorStore`] is the control plane (list / create / describe indexes)
//! and hands out [`VectorIndex`] handles for the data plane (upsert /
//! query). The Pinecone client in the app crate and the
//! [`memory::InMemoryVectorStore`] both implement these traits, so the
//! pipelines in [`crate::ingest`] and [`crate::answer`] never know which
//! backend they are talking to.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{QueryMatch, VectorRecord};

/// Distance metric an index is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dotproduct",
        };
        f.write_str(s)
    }
}

/// Everything needed to create an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    /// Serverless cloud (e.g. `"aws"`).
    pub cloud: String,
    /// Serverless region (e.g. `"us-west-2"`).
    pub region: String,
}

/// An index as reported by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    /// Data-plane host, when the backend has one.
    pub host: Option<String>,
    pub ready: bool,
}

/// Result of a create call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The store already had an index with that name.
    AlreadyExists,
}

/// Parameters of a single similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub include_values: bool,
}

/// Control-plane operations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>>;

    async fn create_index(&self, spec: &IndexSpec) -> Result<CreateOutcome>;

    /// Returns `None` when no index has that name.
    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>>;

    /// Opens a data-plane handle on an existing index.
    async fn index(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}

/// Data-plane operations on one index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Inserts or replaces records by id. Returns the number upserted.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Returns at most `top_k` matches, best first.
    async fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>>;
}
