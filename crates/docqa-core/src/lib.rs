//! # docqa core
//!
//! Shared logic for docqa: data models, the recursive text splitter, the
//! embedding / generation / vector-store traits, an in-memory vector store,
//! and the two pipelines built on top of them.
//!
//! This crate contains no tokio, filesystem I/O, or HTTP clients. Concrete
//! service clients (OpenAI, Pinecone) live in the `docqa` app crate and
//! plug in through the traits defined here.
//!
//! ## Pipelines
//!
//! ```text
//! Document ──▶ TextSplitter ──▶ Embedder ──▶ VectorIndex::upsert   (ingest)
//! question ──▶ Embedder ──▶ VectorIndex::query ──▶ Generator        (answer)
//! ```

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod store;
