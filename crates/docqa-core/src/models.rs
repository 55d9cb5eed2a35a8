//! Core data models that flow through the ingestion and query pipelines.
//!
//! A [`Document`] is split into [`Chunk`]s, each chunk becomes one
//! [`VectorRecord`] in the vector store, and a similarity search returns
//! [`QueryMatch`]es carrying the stored [`VectorMetadata`].

use serde::{Deserialize, Serialize};

/// A loaded source document. Discarded once it has been chunked.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path relative to the documents root, `/`-separated.
    pub path: String,
    pub text: String,
}

impl Document {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Inclusive 1-based line range of a chunk inside its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub from: usize,
    pub to: usize,
}

/// Where a chunk sits in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    pub lines: LineSpan,
}

/// A bounded-size piece of a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub source_path: String,
    /// 0-based, contiguous within the source document.
    pub ordinal: usize,
    pub text: String,
    pub loc: ChunkLocation,
}

impl Chunk {
    /// Record identity in the vector store: `{source_path}-{ordinal}`.
    pub fn id(&self) -> String {
        chunk_id(&self.source_path, self.ordinal)
    }
}

pub fn chunk_id(source_path: &str, ordinal: usize) -> String {
    format!("{}-{}", source_path, ordinal)
}

/// Metadata stored alongside every vector.
///
/// Field names match the stored JSON (`textPath`, `pageContent`, `loc`);
/// `loc` is the JSON-encoded [`ChunkLocation`] because the store only
/// accepts flat metadata values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    pub text_path: String,
    pub page_content: String,
    #[serde(default)]
    pub loc: String,
}

/// One embedded chunk, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl VectorRecord {
    /// Pairs a chunk with its embedding.
    pub fn from_chunk(chunk: &Chunk, values: Vec<f32>) -> Self {
        // ChunkLocation only holds integers, serialization cannot fail.
        let loc = serde_json::to_string(&chunk.loc).unwrap_or_default();
        Self {
            id: chunk.id(),
            values,
            metadata: VectorMetadata {
                text_path: chunk.source_path.clone(),
                page_content: chunk.text.clone(),
                loc,
            },
        }
    }
}

/// A single similarity-search hit, in the order the store returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<VectorMetadata>,
}
