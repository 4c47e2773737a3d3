use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum GatewayError {
    /// Upstream kept failing (5xx, network errors) until the attempt budget ran out
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream answered with an authoritative 4xx
    #[error("Request rejected by upstream ({status}): {message}")]
    RequestRejected { status: u16, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The page or payload came back but its structure was not what we expected
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cache computation timed out: {0}")]
    ComputeTimeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Coarse classification the routing layer uses to pick a client-facing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UpstreamUnreachable,
    NotFound,
    ClientRejected,
    MalformedInput,
    Extraction,
    Internal,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::UpstreamUnavailable(_)
            | GatewayError::UpstreamTimeout(_)
            | GatewayError::RateLimited(_)
            | GatewayError::ComputeTimeout(_) => ErrorKind::UpstreamUnreachable,
            GatewayError::NotFound(_) => ErrorKind::NotFound,
            GatewayError::RequestRejected { .. } => ErrorKind::ClientRejected,
            GatewayError::InvalidInput(_) => ErrorKind::MalformedInput,
            GatewayError::ExtractionFailure(_) | GatewayError::SerializationError(_) => {
                ErrorKind::Extraction
            }
            GatewayError::ConfigError(_) | GatewayError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Whether another attempt against the same upstream could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::UpstreamUnavailable(_)
                | GatewayError::UpstreamTimeout(_)
                | GatewayError::RateLimited(_)
        )
    }

    /// HTTP status the gateway should answer with for this error
    pub fn http_status(&self) -> u16 {
        match self {
            GatewayError::UpstreamUnavailable(_) => 502,
            GatewayError::UpstreamTimeout(_) | GatewayError::ComputeTimeout(_) => 504,
            GatewayError::RateLimited(_) => 503,
            GatewayError::NotFound(_) => 404,
            GatewayError::RequestRejected { status, .. } => *status,
            GatewayError::InvalidInput(_) => 400,
            GatewayError::ExtractionFailure(_) | GatewayError::SerializationError(_) => 502,
            GatewayError::ConfigError(_) | GatewayError::InternalError(_) => 500,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::UpstreamTimeout(err.to_string())
        } else if err.is_connect() {
            GatewayError::UpstreamUnavailable(format!(
                "Failed to connect to upstream: {}",
                err
            ))
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => GatewayError::RateLimited("Too many requests".to_string()),
                404 => GatewayError::NotFound("Upstream resource not found".to_string()),
                code @ 400..=499 => GatewayError::RequestRejected {
                    status: code,
                    message: err.to_string(),
                },
                _ => GatewayError::UpstreamUnavailable(format!("HTTP {}: {}", status, err)),
            }
        } else if err.is_decode() || err.is_body() {
            GatewayError::ExtractionFailure(err.to_string())
        } else {
            GatewayError::UpstreamUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::SerializationError(err.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
