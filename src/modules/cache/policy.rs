//! Per-route cache keys and freshness rules.

use crate::shared::config::CacheSettings;
use serde::Serialize;

/// Key and TTL a route handler passes to the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDirective {
    pub key: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    default_ttl_seconds: i64,
    rules: Vec<(String, i64)>,
}

impl CachePolicy {
    pub fn new(default_ttl_seconds: i64) -> Self {
        Self {
            default_ttl_seconds,
            rules: Vec::new(),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.default_ttl_seconds)
    }

    /// Use `ttl_seconds` for every path under `prefix`
    pub fn with_rule(mut self, prefix: impl Into<String>, ttl_seconds: i64) -> Self {
        let prefix = normalize_path(&prefix.into());
        self.rules.push((prefix, ttl_seconds));
        self
    }

    /// TTL of the longest matching rule, or the default
    pub fn ttl_for(&self, path: &str) -> i64 {
        let path = normalize_path(path);
        self.rules
            .iter()
            .filter(|(prefix, _)| matches_prefix(&path, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default_ttl_seconds, |(_, ttl)| *ttl)
    }

    /// Stable key for a request: the path plus its query parameters sorted and
    /// percent-encoded, so parameter order never splits the cache
    pub fn key_for(&self, path: &str, query: &[(&str, &str)]) -> String {
        let path = normalize_path(path);
        if query.is_empty() {
            return path;
        }

        let mut pairs: Vec<(&str, &str)> = query.to_vec();
        pairs.sort_unstable();

        let encoded = pairs
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", path, encoded)
    }

    pub fn resolve(&self, path: &str, query: &[(&str, &str)]) -> CacheDirective {
        CacheDirective {
            key: self.key_for(path, query),
            ttl_seconds: self.ttl_for(path),
        }
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}
