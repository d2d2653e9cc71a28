//! Query service client abstraction for testability.

use super::types::{ChannelInfo, ChannelQuery, QueryError, RawRecord};
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, trace};

/// Trait for asynchronous access to the remote query service.
///
/// This abstraction allows for dependency injection and easier testing by
/// enabling scripted clients in tests. Both calls are batched: the engine
/// fetches every channel of every requested segment in one round trip, and
/// the channel catalog resolves all known channel names in one call.
pub trait QueryClient: Send + Sync {
    /// Execute a batch of channel queries.
    ///
    /// # Arguments
    ///
    /// * `queries` - One query per channel, each with its own window
    ///
    /// # Returns
    ///
    /// One record list per query, in query order. An empty inner list means
    /// that channel had no samples in its window.
    fn batch_query(
        &self,
        queries: &[ChannelQuery],
    ) -> impl Future<Output = Result<Vec<Vec<RawRecord>>, QueryError>> + Send;

    /// Resolve channel names to remote ids and units.
    ///
    /// # Arguments
    ///
    /// * `names` - Channel names to resolve
    ///
    /// # Returns
    ///
    /// One entry per name, in name order; `None` for names the service does
    /// not know.
    fn resolve_channels(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<Vec<Option<ChannelInfo>>, QueryError>> + Send;
}

/// Real query client backed by reqwest.
#[derive(Clone)]
pub struct HttpQueryClient {
    client: reqwest::Client,
    base_url: String,
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Deserialize)]
struct BatchQueryResponse {
    results: Vec<Vec<RawRecord>>,
}

#[derive(Deserialize)]
struct ResolveResponse {
    channels: Vec<Option<ChannelInfo>>,
}

impl HttpQueryClient {
    /// Creates a new client for the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, QueryError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| QueryError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post_json<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, QueryError> {
        let url = format!("{}{path}", self.base_url);
        trace!(url = %url, "issuing query service request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| QueryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Service(format!(
                "{path} returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| QueryError::Decode(e.to_string()))
    }
}

impl QueryClient for HttpQueryClient {
    async fn batch_query(
        &self,
        queries: &[ChannelQuery],
    ) -> Result<Vec<Vec<RawRecord>>, QueryError> {
        debug!(query_count = queries.len(), "batch query");
        let body = serde_json::json!({ "queries": queries });
        let response: BatchQueryResponse = self.post_json("/api/batch-query", &body).await?;

        if response.results.len() != queries.len() {
            return Err(QueryError::Decode(format!(
                "expected {} result lists, got {}",
                queries.len(),
                response.results.len()
            )));
        }
        Ok(response.results)
    }

    async fn resolve_channels(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<ChannelInfo>>, QueryError> {
        debug!(name_count = names.len(), "resolving channel names");
        let body = serde_json::json!({ "names": names });
        let response: ResolveResponse = self.post_json("/api/channels/resolve", &body).await?;

        if response.channels.len() != names.len() {
            return Err(QueryError::Decode(format!(
                "expected {} channel entries, got {}",
                names.len(),
                response.channels.len()
            )));
        }
        Ok(response.channels)
    }
}
