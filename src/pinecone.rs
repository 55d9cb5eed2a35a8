//! Pinecone REST client.
//!
//! [`PineconeStore`] talks to the control plane (`/indexes`) and opens
//! [`PineconeIndex`] handles that talk to an index's own data-plane host
//! (`/vectors/upsert`, `/query`). Requests carry the `Api-Key` header from
//! `PINECONE_API_KEY` and a pinned `X-Pinecone-API-Version`.
//!
//! Upserts are never retried; a failed batch fails the whole ingest.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use docqa_core::models::{QueryMatch, VectorRecord};
use docqa_core::store::{
    CreateOutcome, IndexDescription, IndexSpec, Metric, QueryRequest, VectorIndex, VectorStore,
};

use crate::config::StoreConfig;

/// Control-plane client.
#[derive(Clone)]
pub struct PineconeStore {
    client: Client,
    controller_url: String,
}

impl PineconeStore {
    /// Creates the client, reading the key from `PINECONE_API_KEY`.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| anyhow::anyhow!("PINECONE_API_KEY environment variable not set"))?;
        Self::with_api_key(config, &api_key)
    }

    pub fn with_api_key(config: &StoreConfig, api_key: &str) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");
        anyhow::ensure!(
            config.controller_url.starts_with("http://")
                || config.controller_url.starts_with("https://"),
            "store.controller_url must be an http(s) URL"
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?,
        );
        headers.insert(
            "X-Pinecone-API-Version",
            HeaderValue::from_str(&config.api_version).context("invalid store.api_version")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build Pinecone HTTP client")?;

        Ok(Self {
            client,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>> {
        let url = format!("{}/indexes", self.controller_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to list Pinecone indexes")?;
        let resp = ensure_success(resp, "list indexes").await?;
        let list: IndexList = resp
            .json()
            .await
            .context("failed to parse Pinecone index list")?;
        Ok(list.indexes.into_iter().map(IndexModel::into_description).collect())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<CreateOutcome> {
        let url = format!("{}/indexes", self.controller_url);
        let body = CreateIndexRequest::from_spec(spec);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to create Pinecone index {}", spec.name))?;

        if resp.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::AlreadyExists);
        }
        ensure_success(resp, "create index").await?;
        Ok(CreateOutcome::Created)
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.controller_url, name);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("failed to describe Pinecone index {}", name))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp, "describe index").await?;
        let model: IndexModel = resp
            .json()
            .await
            .context("failed to parse Pinecone index description")?;
        Ok(Some(model.into_description()))
    }

    async fn index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let description = self
            .describe_index(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Pinecone index not found: {}", name))?;
        let host = description
            .host
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("Pinecone index {} has no host yet", name))?;

        Ok(Arc::new(PineconeIndex {
            client: self.client.clone(),
            name: name.to_string(),
            base_url: data_plane_url(&host),
        }))
    }
}

/// Data-plane handle for one index.
pub struct PineconeIndex {
    client: Client,
    name: String,
    base_url: String,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let url = format!("{}/vectors/upsert", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&UpsertRequest { vectors: records })
            .send()
            .await
            .with_context(|| format!("failed to upsert into {}", self.name))?;
        let resp = ensure_success(resp, "upsert").await?;
        let parsed: UpsertResponse = resp
            .json()
            .await
            .context("failed to parse Pinecone upsert response")?;
        Ok(parsed.upserted_count)
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>> {
        let url = format!("{}/query", self.base_url);
        let body = QueryBody {
            vector: &request.vector,
            top_k: request.top_k,
            include_metadata: request.include_metadata,
            include_values: request.include_values,
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to query {}", self.name))?;
        let resp = ensure_success(resp, "query").await?;
        let parsed: QueryResponse = resp
            .json()
            .await
            .context("failed to parse Pinecone query response")?;
        Ok(parsed.matches)
    }
}

/// Pinecone reports bare hostnames; local emulators report full URLs.
fn data_plane_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

async fn ensure_success(resp: reqwest::Response, op: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    bail!("Pinecone {} failed ({}): {}", op, status, body)
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: Metric,
    spec: ServerlessWrapper<'a>,
}

#[derive(Serialize)]
struct ServerlessWrapper<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

impl<'a> CreateIndexRequest<'a> {
    fn from_spec(spec: &'a IndexSpec) -> Self {
        Self {
            name: &spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: ServerlessWrapper {
                serverless: ServerlessSpec {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    #[serde(default)]
    metric: Metric,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatusModel>,
}

#[derive(Deserialize)]
struct IndexStatusModel {
    #[serde(default)]
    ready: bool,
}

impl IndexModel {
    fn into_description(self) -> IndexDescription {
        IndexDescription {
            name: self.name,
            dimension: self.dimension,
            metric: self.metric,
            host: self.host,
            ready: self.status.map(|s| s.ready).unwrap_or(false),
        }
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}
