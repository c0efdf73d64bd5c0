//! Pinecone serverless index: control-plane admin and data-plane store
//!
//! The control plane (`api.pinecone.io`) describes, creates and deletes
//! indexes. Each index has its own data-plane host for upsert and query;
//! `PineconeStore::connect` resolves it once at startup.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{RagConfig, Secret};
use crate::error::{Error, Result};
use crate::types::{IndexStats, IndexedRecord, RecordMetadata, RetrievedChunk, RetrievedContext};

use super::http::{build_client, check_response};
use super::vector_store::{check_batch, check_dimension, VectorStoreProvider};

const API_VERSION: &str = "2024-07";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Index as reported by the control plane
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub metric: String,
    /// Data-plane host, without scheme
    pub host: String,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

fn pinecone_request(
    client: &Client,
    api_key: &Secret,
    method: Method,
    url: String,
) -> RequestBuilder {
    client
        .request(method, url)
        .header("Api-Key", api_key.expose())
        .header("X-Pinecone-API-Version", API_VERSION)
}

impl IndexStatus {
    /// Deletion accepted but not finished; the name cannot be reused yet
    pub fn is_terminating(&self) -> bool {
        self.state.eq_ignore_ascii_case("Terminating")
    }
}

/// Control-plane operations: index lifecycle
pub struct PineconeAdmin {
    client: Client,
    api_key: Secret,
    controller_url: String,
    poll_interval: Duration,
}

impl PineconeAdmin {
    pub fn new(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.vector_store.timeout_secs)?,
            api_key: config.vector_store.api_key.clone(),
            controller_url: config
                .vector_store
                .controller_url
                .trim_end_matches('/')
                .to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Interval between describe calls while waiting on index state
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        pinecone_request(
            &self.client,
            &self.api_key,
            method,
            format!("{}{}", self.controller_url, path),
        )
    }

    /// Describe `name`; `NotFound` if it does not exist
    pub async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let response = self
            .request(Method::GET, &format!("/indexes/{}", name))
            .send()
            .await?;
        let response = check_response("Pinecone describe_index", response).await?;
        Ok(response.json().await?)
    }

    /// Names of all indexes in the project
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        let response = self.request(Method::GET, "/indexes").send().await?;
        let response = check_response("Pinecone list_indexes", response).await?;
        let list: IndexList = response.json().await?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    /// Whether `name` exists and is not being deleted
    pub async fn index_exists(&self, name: &str) -> Result<bool> {
        match self.describe_index(name).await {
            Ok(description) => Ok(!description.status.is_terminating()),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create the configured serverless index. An existing, live index is
    /// left as is; one still being deleted is a `TransientApi` error.
    pub async fn create_index(&self, config: &RagConfig) -> Result<()> {
        let store = &config.vector_store;
        let body = json!({
            "name": store.index_name,
            "dimension": config.embeddings.dimensions,
            "metric": store.metric.as_str(),
            "spec": {
                "serverless": {
                    "cloud": store.cloud,
                    "region": store.region,
                }
            }
        });

        let response = self
            .request(Method::POST, "/indexes")
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return match self.describe_index(&store.index_name).await {
                Ok(description) if !description.status.is_terminating() => {
                    tracing::info!("Pinecone index '{}' already exists", store.index_name);
                    Ok(())
                }
                Ok(_) | Err(Error::NotFound(_)) => Err(Error::transient(format!(
                    "index '{}' is still being deleted",
                    store.index_name
                ))),
                Err(e) => Err(e),
            };
        }
        check_response("Pinecone create_index", response).await?;

        tracing::info!(
            "Created Pinecone index '{}' ({} dims, {}, {}/{})",
            store.index_name,
            config.embeddings.dimensions,
            store.metric.as_str(),
            store.cloud,
            store.region
        );
        Ok(())
    }

    /// Request deletion of `name`. Returns false if there was nothing to
    /// delete. Deletion finishes asynchronously; see `wait_until_deleted`.
    pub async fn delete_index(&self, name: &str) -> Result<bool> {
        let response = self
            .request(Method::DELETE, &format!("/indexes/{}", name))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_response("Pinecone delete_index", response).await?;
        tracing::info!("Deletion of Pinecone index '{}' accepted", name);
        Ok(true)
    }

    /// Poll until describing `name` returns `NotFound`
    pub async fn wait_until_deleted(&self, name: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        loop {
            match self.describe_index(name).await {
                Err(Error::NotFound(_)) => return Ok(()),
                Ok(description) => {
                    tracing::debug!("Index '{}' state: {}", name, description.status.state)
                }
                Err(e) => return Err(e),
            }

            if start.elapsed() >= timeout {
                return Err(Error::transient(format!(
                    "index '{}' not deleted after {}s",
                    name,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Poll until the index reports ready, failing with `TransientApi` after `timeout`
    pub async fn wait_until_ready(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<IndexDescription> {
        let start = Instant::now();
        loop {
            match self.describe_index(name).await {
                Ok(description) if description.status.is_terminating() => {
                    return Err(Error::transient(format!("index '{}' is being deleted", name)))
                }
                Ok(description) if description.status.ready => return Ok(description),
                Ok(description) => {
                    tracing::debug!("Index '{}' state: {}", name, description.status.state)
                }
                // A freshly created index can briefly 404
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            if start.elapsed() >= timeout {
                return Err(Error::transient(format!(
                    "index '{}' not ready after {}s",
                    name,
                    timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Create the configured index if missing and wait for it to be ready.
    /// An index still being deleted is waited out and then recreated.
    pub async fn ensure_index(
        &self,
        config: &RagConfig,
        timeout: Duration,
    ) -> Result<IndexDescription> {
        let name = &config.vector_store.index_name;
        let start = Instant::now();

        let create = match self.describe_index(name).await {
            Ok(description) if description.status.is_terminating() => {
                tracing::info!("Waiting for deletion of Pinecone index '{}'...", name);
                self.wait_until_deleted(name, timeout).await?;
                true
            }
            Ok(_) => false,
            Err(Error::NotFound(_)) => true,
            Err(e) => return Err(e),
        };

        if create {
            tracing::info!("Creating Pinecone index '{}'...", name);
            self.create_index(config).await?;
        }
        self.wait_until_ready(name, timeout.saturating_sub(start.elapsed()))
            .await
    }

    /// Delete the configured index, wait for the deletion to finish, then
    /// recreate it and wait until it is ready
    pub async fn reset_index(
        &self,
        config: &RagConfig,
        timeout: Duration,
    ) -> Result<IndexDescription> {
        let name = &config.vector_store.index_name;
        if self.delete_index(name).await? {
            tracing::info!("Waiting for deletion of Pinecone index '{}'...", name);
            self.wait_until_deleted(name, timeout).await?;
        }
        self.ensure_index(config, timeout).await
    }
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a RecordMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    // Numbers come back as floats, so only the text is read
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

/// Map query matches to retrieved chunks, dropping those without text
fn matches_to_chunks(matches: Vec<QueryMatch>) -> Vec<RetrievedChunk> {
    matches
        .into_iter()
        .filter_map(|m| {
            let text = m
                .metadata
                .as_ref()
                .and_then(|meta| meta.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string);
            match text {
                Some(text) => Some(RetrievedChunk {
                    id: m.id,
                    text,
                    score: m.score,
                }),
                None => {
                    tracing::warn!("Match '{}' has no text metadata, skipping", m.id);
                    None
                }
            }
        })
        .collect()
}

/// Data-plane client for one Pinecone index
pub struct PineconeStore {
    client: Client,
    api_key: Secret,
    host: String,
    index_name: String,
    namespace: String,
    dimension: usize,
    upsert_batch_size: usize,
}

impl PineconeStore {
    /// Describe the configured index and check it against the configuration
    pub async fn connect(config: &RagConfig) -> Result<Self> {
        let admin = PineconeAdmin::new(config)?;
        let name = &config.vector_store.index_name;
        let description = admin.describe_index(name).await.map_err(|e| match e {
            Error::NotFound(_) => Error::NotFound(format!(
                "Pinecone index '{}' does not exist; create it with rag-chatbot-ingest --reset",
                name
            )),
            other => other,
        })?;

        let store = Self::from_description(config, &description)?;
        tracing::info!(
            "Connected to Pinecone index '{}' ({} dims, {}) at {}",
            description.name,
            description.dimension,
            description.metric,
            store.host
        );
        Ok(store)
    }

    /// Build a store for an already described index
    pub fn from_description(config: &RagConfig, description: &IndexDescription) -> Result<Self> {
        let configured = config.embeddings.dimensions;
        if description.dimension != configured {
            return Err(Error::DimensionMismatch {
                expected: description.dimension,
                actual: configured,
            });
        }
        if description.metric != config.vector_store.metric.as_str() {
            tracing::warn!(
                "Index '{}' uses metric '{}', configured '{}'",
                description.name,
                description.metric,
                config.vector_store.metric.as_str()
            );
        }

        let host = if description.host.starts_with("http://")
            || description.host.starts_with("https://")
        {
            description.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", description.host.trim_end_matches('/'))
        };

        Ok(Self {
            client: build_client(config.vector_store.timeout_secs)?,
            api_key: config.vector_store.api_key.clone(),
            host,
            index_name: description.name.clone(),
            namespace: config.vector_store.namespace.clone(),
            dimension: description.dimension,
            upsert_batch_size: config.vector_store.upsert_batch_size.max(1),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    fn request(&self, path: &str) -> RequestBuilder {
        pinecone_request(
            &self.client,
            &self.api_key,
            Method::POST,
            format!("{}{}", self.host, path),
        )
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        check_batch(self.dimension, records)?;

        let mut stored = 0;
        for batch in records.chunks(self.upsert_batch_size) {
            let body = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|r| UpsertVector {
                        id: &r.id,
                        values: &r.vector,
                        metadata: &r.metadata,
                    })
                    .collect(),
                namespace: &self.namespace,
            };

            let response = self.request("/vectors/upsert").json(&body).send().await?;
            let response = check_response("Pinecone upsert", response).await?;
            let parsed: UpsertResponse = response.json().await?;
            stored += parsed.upserted_count.unwrap_or(batch.len());
        }

        tracing::debug!("Upserted {} vectors into '{}'", stored, self.index_name);
        Ok(stored)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<RetrievedContext> {
        check_dimension(self.dimension, vector)?;
        if top_k == 0 {
            return Ok(RetrievedContext::default());
        }

        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: &self.namespace,
        };

        let response = self.request("/query").json(&body).send().await?;
        let response = check_response("Pinecone query", response).await?;
        let parsed: QueryResponse = response.json().await?;

        Ok(RetrievedContext::ranked(matches_to_chunks(parsed.matches), top_k))
    }

    async fn describe(&self) -> Result<IndexStats> {
        let response = self
            .request("/describe_index_stats")
            .json(&json!({}))
            .send()
            .await?;
        let response = check_response("Pinecone describe_index_stats", response).await?;
        let stats: StatsResponse = response.json().await?;

        let total_vector_count = if self.namespace.is_empty() {
            stats.total_vector_count
        } else {
            stats
                .namespaces
                .get(&self.namespace)
                .map(|ns| ns.vector_count)
                .unwrap_or(0)
        };

        Ok(IndexStats {
            dimension: stats.dimension,
            total_vector_count,
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<bool> {
        match self.describe().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Pinecone health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
