//! HTTP fetch primitive with bounded retries, per-attempt timeout and
//! failure classification. Every upstream call in the gateway goes through it.

use super::request::{FetchRequest, UpstreamResponse};
use super::retry_policy::{classify_status, AttemptOutcome, RetryAttempt, RetryPolicy, StatusClass};
use super::transport::{HttpTransport, ReqwestTransport};
use crate::shared::config::FetchSettings;
use crate::shared::errors::{GatewayError, GatewayResult};
use crate::shared::utils::logger::{LogContext, TimedOperation};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

pub struct ResilientFetcher {
    transport: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl ResilientFetcher {
    /// Fetcher over a real `reqwest` client
    pub fn new(settings: &FetchSettings) -> GatewayResult<Self> {
        let transport = ReqwestTransport::new(settings.attempt_timeout, &settings.user_agent)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            RetryPolicy::from_settings(settings),
            settings.attempt_timeout,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn HttpTransport>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            policy,
            attempt_timeout,
            rate_limiter: None,
        }
    }

    /// Wait on an outbound rate limiter before every attempt
    pub fn with_rate_limit(mut self, requests_per_second: f64, burst_size: u32) -> GatewayResult<Self> {
        if requests_per_second <= 0.0 {
            return Err(GatewayError::ConfigError(
                "Rate limit must be a positive number of requests per second".to_string(),
            ));
        }

        let period = Duration::from_secs_f64(1.0 / requests_per_second);
        let burst = NonZeroU32::new(burst_size.max(1))
            .ok_or_else(|| GatewayError::ConfigError("Burst size must be positive".to_string()))?;
        let quota = Quota::with_period(period)
            .ok_or_else(|| GatewayError::ConfigError("Rate limit period is zero".to_string()))?
            .allow_burst(burst);

        self.rate_limiter = Some(RateLimiter::direct(quota));
        Ok(self)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Check if a request can be made now without waiting on the rate limiter
    pub fn can_make_request_now(&self) -> bool {
        self.rate_limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }

    /// Fetch with the policy's attempt budget
    pub async fn fetch(&self, request: &FetchRequest) -> GatewayResult<UpstreamResponse> {
        self.fetch_with_attempts(request, self.policy.max_attempts)
            .await
    }

    pub async fn fetch_with_attempts(
        &self,
        request: &FetchRequest,
        max_attempts: u32,
    ) -> GatewayResult<UpstreamResponse> {
        self.fetch_traced(request, max_attempts).await.0
    }

    /// Fetch and decode a JSON body; non-success answers become errors
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &FetchRequest) -> GatewayResult<T> {
        self.fetch(request).await?.error_for_status()?.json()
    }

    /// Fetch a page body as text; non-success answers become errors
    pub async fn fetch_text(&self, request: &FetchRequest) -> GatewayResult<String> {
        Ok(self.fetch(request).await?.error_for_status()?.text())
    }

    /// Fetch and also return the record of every attempt made
    pub async fn fetch_traced(
        &self,
        request: &FetchRequest,
        max_attempts: u32,
    ) -> (GatewayResult<UpstreamResponse>, Vec<RetryAttempt>) {
        let max_attempts = max_attempts.max(1);
        let mut attempts = Vec::new();
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if let Some(limiter) = &self.rate_limiter {
                limiter.until_ready().await;
            }

            LogContext::upstream_call(request.method.as_str(), &request.url, None, None);
            let timer = TimedOperation::new(&format!("{} {}", request.method, request.url));
            let result = match timeout(self.attempt_timeout, self.transport.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::UpstreamTimeout(format!(
                    "{} did not answer within {:?}",
                    request.url, self.attempt_timeout
                ))),
            };

            let failure = match result {
                Ok(response) => {
                    LogContext::upstream_call(
                        request.method.as_str(),
                        &request.url,
                        Some(response.status.as_u16()),
                        Some(timer.elapsed_ms()),
                    );

                    match classify_status(response.status) {
                        StatusClass::Success => {
                            attempts.push(RetryAttempt {
                                attempt,
                                delay: None,
                                outcome: AttemptOutcome::Success,
                            });
                            if attempt > 0 {
                                debug!(
                                    "{} succeeded on attempt {} after {} retries",
                                    request.url,
                                    attempt + 1,
                                    attempt
                                );
                            }
                            return (Ok(response), attempts);
                        }
                        StatusClass::NotFound => {
                            attempts.push(RetryAttempt {
                                attempt,
                                delay: None,
                                outcome: AttemptOutcome::TerminalFailure,
                            });
                            debug!("{} answered 404, not retrying", request.url);
                            return (
                                Err(GatewayError::NotFound(format!("HTTP 404: {}", request.url))),
                                attempts,
                            );
                        }
                        StatusClass::Authoritative => {
                            attempts.push(RetryAttempt {
                                attempt,
                                delay: None,
                                outcome: AttemptOutcome::TerminalFailure,
                            });
                            debug!(
                                "{} answered {}, returning response as-is",
                                request.url, response.status
                            );
                            return (Ok(response), attempts);
                        }
                        StatusClass::Retryable => status_error(response.status, &request.url),
                    }
                }
                Err(error) if error.is_transient() => error,
                Err(error) => {
                    attempts.push(RetryAttempt {
                        attempt,
                        delay: None,
                        outcome: AttemptOutcome::TerminalFailure,
                    });
                    return (Err(error), attempts);
                }
            };

            // Don't wait after the last attempt
            let delay = if attempt + 1 < max_attempts {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    "Fetch attempt {}/{} for {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    max_attempts,
                    request.url,
                    failure,
                    delay
                );
                Some(delay)
            } else {
                warn!(
                    "Fetch attempt {}/{} for {} failed ({}), giving up",
                    attempt + 1,
                    max_attempts,
                    request.url,
                    failure
                );
                None
            };

            attempts.push(RetryAttempt {
                attempt,
                delay,
                outcome: AttemptOutcome::RetryableFailure,
            });
            last_error = Some(failure);

            if let Some(delay) = delay {
                sleep(delay).await;
            }
        }

        let error = last_error.unwrap_or_else(|| {
            GatewayError::UpstreamUnavailable(format!("Failed to fetch {} after retries", request.url))
        });
        (Err(error), attempts)
    }
}

fn status_error(status: StatusCode, url: &str) -> GatewayError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        GatewayError::RateLimited(format!("HTTP 429: {}", url))
    } else {
        GatewayError::UpstreamUnavailable(format!("HTTP {}: {}", status, url))
    }
}
