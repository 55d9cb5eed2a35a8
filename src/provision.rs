//! Index provisioning.
//!
//! `ensure_index` is idempotent: it creates the configured index only when
//! the store does not already list it, then waits (bounded) for a freshly
//! created index to report ready.

use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use docqa_core::store::{CreateOutcome, VectorStore};

use crate::config::IndexConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Created,
    AlreadyExists,
}

pub async fn ensure_index(store: &dyn VectorStore, config: &IndexConfig) -> Result<IndexStatus> {
    let existing = store.list_indexes().await?;

    if let Some(found) = existing.iter().find(|i| i.name == config.name) {
        if found.dimension != config.dimension {
            tracing::warn!(
                index = %config.name,
                existing = found.dimension,
                configured = config.dimension,
                "index exists with a different dimension"
            );
        }
        tracing::info!(index = %config.name, "index already exists");
        return Ok(IndexStatus::AlreadyExists);
    }

    tracing::info!(
        index = %config.name,
        dimension = config.dimension,
        metric = %config.metric,
        "creating index"
    );
    match store.create_index(&config.spec()).await? {
        CreateOutcome::AlreadyExists => {
            // Lost a race with another creator.
            tracing::info!(index = %config.name, "index already exists");
            Ok(IndexStatus::AlreadyExists)
        }
        CreateOutcome::Created => {
            wait_until_ready(store, config).await?;
            Ok(IndexStatus::Created)
        }
    }
}

/// Polls `describe_index` until ready. On timeout, logs and returns so the
/// caller can still attempt the upsert.
async fn wait_until_ready(store: &dyn VectorStore, config: &IndexConfig) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(config.ready_timeout_secs);
    let poll = Duration::from_millis(config.ready_poll_ms.max(1));

    loop {
        if let Some(desc) = store.describe_index(&config.name).await? {
            if desc.ready {
                tracing::info!(index = %config.name, "index ready");
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            tracing::warn!(
                index = %config.name,
                timeout_secs = config.ready_timeout_secs,
                "index not ready before timeout, continuing"
            );
            return Ok(());
        }
        tokio::time::sleep(poll).await;
    }
}
