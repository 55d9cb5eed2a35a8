//! Ingestion pipeline: chunk → embed → batched upsert.
//!
//! Documents are processed one after another. For each document the
//! embedder is called once with every chunk, and the resulting records are
//! upserted in batches of at most `batch_size`. The first failing embed or
//! upsert aborts the run; nothing is retried here.

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::chunk::TextSplitter;
use crate::embedding::{prepare_for_embedding, Embedder};
use crate::models::{Chunk, Document, VectorRecord};
use crate::store::VectorIndex;

/// Default number of records per upsert call.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Upper bound on records per upsert call.
pub const MAX_UPSERT_BATCH_SIZE: usize = 100;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub documents: usize,
    /// Documents that produced no chunks.
    pub skipped_empty: usize,
    pub chunks: usize,
    pub embeddings: usize,
    pub vectors_upserted: usize,
    pub upsert_batches: usize,
}

impl IngestStats {
    fn absorb(&mut self, other: &IngestStats) {
        self.documents += other.documents;
        self.skipped_empty += other.skipped_empty;
        self.chunks += other.chunks;
        self.embeddings += other.embeddings;
        self.vectors_upserted += other.vectors_upserted;
        self.upsert_batches += other.upsert_batches;
    }
}

/// Indexes every document, in order.
pub async fn index_documents(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    splitter: &TextSplitter,
    documents: &[Document],
    batch_size: usize,
) -> Result<IngestStats> {
    tracing::info!(
        index = index.name(),
        documents = documents.len(),
        "indexing documents"
    );
    let mut stats = IngestStats::default();
    for doc in documents {
        let doc_stats = index_document(index, embedder, splitter, doc, batch_size).await?;
        stats.absorb(&doc_stats);
    }
    tracing::info!(
        chunks = stats.chunks,
        vectors = stats.vectors_upserted,
        batches = stats.upsert_batches,
        "indexing complete"
    );
    Ok(stats)
}

/// Chunks, embeds and upserts a single document.
pub async fn index_document(
    index: &dyn VectorIndex,
    embedder: &dyn Embedder,
    splitter: &TextSplitter,
    doc: &Document,
    batch_size: usize,
) -> Result<IngestStats> {
    if !(1..=MAX_UPSERT_BATCH_SIZE).contains(&batch_size) {
        bail!(
            "upsert batch size must be in [1, {}], got {}",
            MAX_UPSERT_BATCH_SIZE,
            batch_size
        );
    }
    let mut stats = IngestStats {
        documents: 1,
        ..IngestStats::default()
    };

    tracing::info!(path = %doc.path, "processing document");
    let chunks = splitter.split_document(doc);
    if chunks.is_empty() {
        tracing::debug!(path = %doc.path, "document is empty, skipping");
        stats.skipped_empty = 1;
        return Ok(stats);
    }
    stats.chunks = chunks.len();
    tracing::info!(path = %doc.path, chunks = chunks.len(), "document split");

    let texts: Vec<String> = chunks
        .iter()
        .map(|c| prepare_for_embedding(&c.text))
        .collect();
    let embeddings = embedder
        .embed_documents(&texts)
        .await
        .with_context(|| format!("embedding chunks of {}", doc.path))?;
    stats.embeddings = embeddings.len();

    let records = build_records(&chunks, embeddings)?;

    for (i, batch) in records.chunks(batch_size).enumerate() {
        let first = i * batch_size;
        tracing::debug!(
            path = %doc.path,
            from = first,
            to = first + batch.len() - 1,
            "upserting vectors"
        );
        let n = index
            .upsert(batch)
            .await
            .with_context(|| format!("upserting vectors for {}", doc.path))?;
        stats.vectors_upserted += n;
        stats.upsert_batches += 1;
    }

    Ok(stats)
}

/// Pairs chunks with their embeddings, position by position.
///
/// # Errors
///
/// Fails if the embedder returned a different number of vectors than
/// there are chunks.
pub fn build_records(chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<Vec<VectorRecord>> {
    if chunks.len() != embeddings.len() {
        bail!(
            "embedding provider returned {} vectors for {} chunks",
            embeddings.len(),
            chunks.len()
        );
    }
    Ok(chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, values)| VectorRecord::from_chunk(chunk, values))
        .collect())
}
