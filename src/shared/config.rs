//! Gateway configuration loaded from the environment (and `.env` when present).

use crate::shared::errors::{GatewayError, GatewayResult};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for `FETCH_MAX_ATTEMPTS`
pub const MAX_FETCH_ATTEMPTS: u32 = 10;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Settings for the resilient fetcher
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub attempt_timeout: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Settings for the coalescing cache
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub default_ttl_seconds: i64,
    pub max_entries: usize,
    /// `None` lets a computation run for as long as it takes
    pub compute_deadline: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: 300,
            max_entries: 10_000,
            compute_deadline: None,
        }
    }
}

/// Remote proxy function that resolves episode sources
#[derive(Debug, Clone)]
pub struct EpisodeProxySettings {
    pub url: String,
    pub key: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub episode_proxy: Option<EpisodeProxySettings>,
}

impl GatewayConfig {
    /// Load configuration from environment variables, reading `.env` first
    pub fn from_env() -> GatewayResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> GatewayResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            attempt_timeout: Duration::from_secs(parse_var(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                defaults.attempt_timeout.as_secs(),
            )?),
            max_attempts: parse_var(&lookup, "FETCH_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay: Duration::from_millis(parse_var(
                &lookup,
                "FETCH_BASE_DELAY_MS",
                defaults.base_delay.as_millis() as u64,
            )?),
            user_agent: lookup("UPSTREAM_USER_AGENT").unwrap_or(defaults.user_agent),
        };

        if fetch.max_attempts == 0 || fetch.max_attempts > MAX_FETCH_ATTEMPTS {
            return Err(GatewayError::ConfigError(format!(
                "FETCH_MAX_ATTEMPTS must be between 1 and {}",
                MAX_FETCH_ATTEMPTS
            )));
        }

        let cache_defaults = CacheSettings::default();
        let deadline_secs: u64 = parse_var(&lookup, "CACHE_COMPUTE_DEADLINE_SECS", 0)?;
        let cache = CacheSettings {
            default_ttl_seconds: parse_var(
                &lookup,
                "CACHE_DEFAULT_TTL_SECS",
                cache_defaults.default_ttl_seconds,
            )?,
            max_entries: parse_var(&lookup, "CACHE_MAX_ENTRIES", cache_defaults.max_entries)?,
            compute_deadline: (deadline_secs > 0).then(|| Duration::from_secs(deadline_secs)),
        };

        let episode_proxy = match (lookup("EPISODE_PROXY_URL"), lookup("EPISODE_PROXY_KEY")) {
            (Some(url), Some(key)) => Some(EpisodeProxySettings {
                url,
                key,
                ttl_seconds: parse_var(&lookup, "EPISODE_CACHE_TTL_SECS", 3600)?,
            }),
            (Some(_), None) => {
                return Err(GatewayError::ConfigError(
                    "EPISODE_PROXY_URL is set but EPISODE_PROXY_KEY is missing".to_string(),
                ))
            }
            _ => None,
        };

        Ok(Self {
            fetch,
            cache,
            episode_proxy,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> GatewayResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            GatewayError::ConfigError(format!("{} has invalid value '{}': {}", name, raw, e))
        }),
        None => Ok(default),
    }
}
