//! Retry policy and status classification for upstream fetches
//!
//! Separates "upstream is temporarily overloaded" (retry) from "this resource
//! does not exist" or "the request itself was rejected" (fail fast).

use crate::shared::config::FetchSettings;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Configuration for HTTP retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Maximum delay to wait (prevents excessive waits)
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add up to 10% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    /// 3 attempts, `2^i * 500ms` between them, no jitter
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay,
            ..Self::default()
        }
    }

    /// Spread retries from many callers hitting the same failing site
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Delay to sleep after the failed attempt with index `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let mut delay =
            Duration::from_millis((self.base_delay.as_millis() as f64 * multiplier) as u64)
                .min(self.max_delay);

        if self.jitter {
            let jitter_ms = (delay.as_millis() as f64 * 0.1 * rand::random::<f64>()) as u64;
            delay += Duration::from_millis(jitter_ms);
        }

        delay
    }
}

/// How a single upstream status code is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx, 206, 302: hand the response back
    Success,
    /// 404: the resource does not exist, never retried
    NotFound,
    /// Other 4xx except 429: returned as-is for the caller to interpret
    Authoritative,
    /// 5xx, 429 and anything else: worth another attempt
    Retryable,
}

pub fn classify_status(status: StatusCode) -> StatusClass {
    match status.as_u16() {
        200..=299 | 302 => StatusClass::Success,
        404 => StatusClass::NotFound,
        429 => StatusClass::Retryable,
        400..=499 => StatusClass::Authoritative,
        _ => StatusClass::Retryable,
    }
}

/// Outcome of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    TerminalFailure,
}

/// Record of one attempt made by the fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryAttempt {
    /// 0-based attempt index
    pub attempt: u32,
    /// Backoff slept after this attempt, if another one followed
    pub delay: Option<Duration>,
    pub outcome: AttemptOutcome,
}
