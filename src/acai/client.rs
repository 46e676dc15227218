//! ACAI GraphQL client
//!
//! One instance is built at startup and shared by the Controller. There is no
//! response cache: every search is a fresh round trip.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::SearchError;
use super::query::{AcaiRecordFilter, GraphQlRequest, GraphQlResponse};
use super::types::{AcaiRecord, SearchParameters};
use crate::config::AppConfig;

/// Anything that can answer a search. The Controller only sees this trait.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run one search. A triggered token must end the call with `SearchError::Cancelled`.
    async fn search(
        &self,
        params: &SearchParameters,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<AcaiRecord>, SearchError>;
}

/// ACAI client configuration
#[derive(Debug, Clone)]
pub struct AcaiConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl From<&AppConfig> for AcaiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            endpoint: config.graphql_endpoint.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }
}

pub struct AcaiClient {
    config: AcaiConfig,
    client: Client,
}

impl AcaiClient {
    pub fn new(config: AcaiConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(config: AcaiConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn execute(&self, filter: &AcaiRecordFilter) -> Result<Vec<AcaiRecord>, SearchError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&GraphQlRequest::acai_records(filter))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Transport(format!(
                "ACAI service returned {}",
                status
            )));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Transport(format!("Invalid response: {}", e)))?;

        body.into_records()
    }
}

#[async_trait]
impl SearchBackend for AcaiClient {
    async fn search(
        &self,
        params: &SearchParameters,
        cancel_token: &CancellationToken,
    ) -> Result<Vec<AcaiRecord>, SearchError> {
        let filter = AcaiRecordFilter::from_parameters(params)?;

        if cancel_token.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        log::debug!("Querying ACAI at {} with {:?}", self.config.endpoint, filter);

        // Dropping the request future aborts the connection
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => Err(SearchError::Cancelled),
            result = self.execute(&filter) => result,
        }
    }
}
