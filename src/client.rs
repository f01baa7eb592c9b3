use crate::model::{ButtonStates, ConsoleConfig, Endpoint};
use anyhow::{Context, Result};
use reqwest::Url;
use serde::de::DeserializeOwned;

/// Reasons a single backend request can fail.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response body from {endpoint}: {source}")]
    Parse {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            FetchError::Network { endpoint, .. } | FetchError::Parse { endpoint, .. } => *endpoint,
        }
    }
}

/// HTTP client for the agent backend.
///
/// Like a browser `fetch`, the HTTP status is not inspected: only transport
/// errors and undecodable bodies count as failures.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(cfg: &ConsoleConfig) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base url {:?}", cfg.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("base url {:?} cannot carry a path", cfg.base_url);
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{}", endpoint.path()));
        url
    }

    async fn get_text(&self, endpoint: Endpoint) -> Result<String, FetchError> {
        let network = |source| FetchError::Network { endpoint, source };
        let resp = self
            .http
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(network)?;
        resp.text().await.map_err(network)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, FetchError> {
        let body = self.get_text(endpoint).await?;
        serde_json::from_str(&body).map_err(|source| FetchError::Parse { endpoint, source })
    }

    pub async fn log_messages(&self) -> Result<Vec<String>, FetchError> {
        self.get_json(Endpoint::LogMessages).await
    }

    pub async fn button_states(&self) -> Result<ButtonStates, FetchError> {
        self.get_json(Endpoint::ButtonStates).await
    }

    pub async fn run_agents(&self) -> Result<String, FetchError> {
        self.get_text(Endpoint::RunAgents).await
    }

    pub async fn stop_agents(&self) -> Result<String, FetchError> {
        self.get_text(Endpoint::StopAgents).await
    }
}
