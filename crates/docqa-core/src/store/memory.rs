//! In-memory [`VectorStore`] implementation for tests and local runs.
//!
//! Indexes live in a `HashMap` behind `std::sync::RwLock`. Search is
//! brute force over every stored vector. Indexes are ready as soon as they
//! are created.
//!
//! Scores follow the Pinecone conventions per metric: cosine similarity and
//! raw dot product rank highest first; `euclidean` reports the *squared*
//! Euclidean distance and ranks lowest first. Only the ordering is relied on
//! by the pipelines, never the absolute score.
//!
//! The store also keeps a few counters (create calls, upsert batch sizes)
//! so tests can assert on how the pipelines drove it.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{QueryMatch, VectorRecord};

use super::{
    CreateOutcome, IndexDescription, IndexSpec, Metric, QueryRequest, VectorIndex, VectorStore,
};

/// In-memory store holding any number of named indexes.
#[derive(Default)]
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, Arc<MemoryIndex>>>,
    create_calls: AtomicUsize,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`VectorStore::create_index`] actually created an index.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Concrete handle for inspection in tests.
    pub fn memory_index(&self, name: &str) -> Option<Arc<MemoryIndex>> {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let indexes = self.indexes.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<IndexDescription> = indexes.values().map(|i| i.describe()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<CreateOutcome> {
        if spec.dimension == 0 {
            bail!("index dimension must be > 0");
        }
        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        if indexes.contains_key(&spec.name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        indexes.insert(
            spec.name.clone(),
            Arc::new(MemoryIndex::new(&spec.name, spec.dimension, spec.metric)),
        );
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CreateOutcome::Created)
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        Ok(self.memory_index(name).map(|i| i.describe()))
    }

    async fn index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        match self.memory_index(name) {
            Some(index) => Ok(index),
            None => bail!("index '{}' not found", name),
        }
    }
}

/// A single in-memory index.
pub struct MemoryIndex {
    name: String,
    dimension: usize,
    metric: Metric,
    records: RwLock<BTreeMap<String, VectorRecord>>,
    batches: RwLock<Vec<usize>>,
}

impl MemoryIndex {
    fn new(name: &str, dimension: usize, metric: Metric) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            metric,
            records: RwLock::new(BTreeMap::new()),
            batches: RwLock::new(Vec::new()),
        }
    }

    fn describe(&self) -> IndexDescription {
        IndexDescription {
            name: self.name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            host: None,
            ready: true,
        }
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sizes of every upsert call received, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Stored record ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<VectorRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Euclidean scores are squared distances, not their square root.
    fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            Metric::Euclidean => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if let Some(bad) = records.iter().find(|r| r.values.len() != self.dimension) {
            bail!(
                "vector '{}' has dimension {}, index '{}' expects {}",
                bad.id,
                bad.values.len(),
                self.name,
                self.dimension
            );
        }
        let mut stored = self.records.write().unwrap_or_else(PoisonError::into_inner);
        for r in records {
            stored.insert(r.id.clone(), r.clone());
        }
        self.batches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(records.len());
        Ok(records.len())
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>> {
        if request.vector.len() != self.dimension {
            bail!(
                "query vector has dimension {}, index '{}' expects {}",
                request.vector.len(),
                self.name,
                self.dimension
            );
        }
        let stored = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<QueryMatch> = stored
            .values()
            .map(|r| QueryMatch {
                id: r.id.clone(),
                score: self.score(&request.vector, &r.values),
                values: if request.include_values {
                    r.values.clone()
                } else {
                    Vec::new()
                },
                metadata: request.include_metadata.then(|| r.metadata.clone()),
            })
            .collect();

        // Euclidean is a distance: smaller is better.
        let ascending = self.metric == Metric::Euclidean;
        matches.sort_by(|a, b| {
            let ord = if ascending {
                a.score.partial_cmp(&b.score)
            } else {
                b.score.partial_cmp(&a.score)
            };
            ord.unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(request.top_k);
        Ok(matches)
    }
}
