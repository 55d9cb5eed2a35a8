//! # docqa
//!
//! Question answering over a local documents directory.
//!
//! `setup` loads `.txt`, `.md` and `.pdf` files, splits them into chunks,
//! embeds them with OpenAI and upserts them into a Pinecone index. `ask`
//! embeds a question, pulls the ten nearest chunks and has the completion
//! model answer from them. Both flows are exposed through the `docqa` CLI
//! and a small HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────┐
//! │  loader    │──▶│ chunk+embed  │──▶│ Pinecone │
//! │ txt/md/pdf │   │  (ingest)    │   │  index   │
//! └────────────┘   └──────────────┘   └────┬─────┘
//!                                          │ top-k
//!                  ┌──────────────┐        │
//!   question ─────▶│   answer     │◀───────┘
//!                  │ stuff + LLM  │
//!                  └──────────────┘
//! ```
//!
//! The pipelines themselves live in `docqa-core` and only see traits; this
//! crate supplies the HTTP clients, the loader, configuration and the
//! server.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Text extraction per file type |
//! | [`loader`] | Documents directory walker |
//! | [`embedding`] | OpenAI embeddings client |
//! | [`generation`] | OpenAI completions client |
//! | [`pinecone`] | Pinecone REST client |
//! | [`provision`] | Idempotent index creation |
//! | [`services`] | Backend wiring |
//! | [`pipeline`] | Setup and ask flows |
//! | [`server`] | HTTP server |

pub mod config;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod loader;
pub mod pinecone;
pub mod pipeline;
pub mod provision;
pub mod server;
pub mod services;

pub use docqa_core;
