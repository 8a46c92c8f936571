use async_trait::async_trait;
use reqwest::Client;

use crate::{
    config::HttpConfig,
    error::FetchError,
    model::ForecastResponse,
    retry::{RetryConfig, with_retry},
};

use super::ForecastProvider;

/// Open-Meteo (or API-compatible) hourly forecast client.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    retry: RetryConfig,
}

impl OpenMeteoProvider {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self::with_client(http, config.retry_config()))
    }

    pub fn with_client(http: Client, retry: RetryConfig) -> Self {
        Self { http, retry }
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoProvider {
    async fn fetch_forecast(&self, url: &str) -> Result<ForecastResponse, FetchError> {
        tracing::debug!(url, "Requesting hourly forecast");

        let res = with_retry(&self.retry, || self.http.get(url).send()).await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
