use super::request::{FetchRequest, UpstreamResponse};
use crate::shared::errors::{GatewayError, GatewayResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Sends one HTTP request, no retries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> GatewayResult<UpstreamResponse>;
}

/// Transport backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &FetchRequest) -> GatewayResult<UpstreamResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();

        // A connection dropped mid-body is a network failure, not a parse failure
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::UpstreamTimeout(format!("Reading body from {}: {}", url, e))
            } else {
                GatewayError::UpstreamUnavailable(format!("Reading body from {}: {}", url, e))
            }
        })?;

        Ok(UpstreamResponse::new(status, headers, url, body.to_vec()))
    }
}
