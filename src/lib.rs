pub mod modules;
pub mod shared;

pub use modules::cache::{CacheDirective, CachePolicy, CacheStats, CoalescingCache, EntryState};
pub use modules::catalog::{Operation, Provider, ProviderCategory};
pub use modules::episode::EpisodeSourceService;
pub use modules::fetch::{FetchRequest, HttpTransport, ResilientFetcher, RetryPolicy, UpstreamResponse};
pub use modules::identifier::{
    normalize_language, parse_resource_identifier, LanguageTag, ParsedIdentifier,
};
pub use shared::{GatewayConfig, GatewayError, GatewayResult};

use serde_json::Value;
use shared::utils::logger::init_logger;
use std::sync::Arc;

const EPISODE_ROUTE: &str = "/api/v1/watchaw/episode";

/// Process-wide services shared by every route handler
pub struct GatewayCore {
    pub config: GatewayConfig,
    pub cache: CoalescingCache<Value>,
    pub fetcher: Arc<ResilientFetcher>,
    pub policy: CachePolicy,
    pub episodes: EpisodeSourceService,
}

impl GatewayCore {
    /// Load `.env` and the environment, initialise logging and wire services
    pub fn from_env() -> GatewayResult<Self> {
        init_logger();
        Self::from_config(GatewayConfig::from_env()?)
    }

    pub fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        let fetcher = Arc::new(ResilientFetcher::new(&config.fetch)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Wire services around an existing fetcher (custom transport in tests)
    pub fn with_fetcher(config: GatewayConfig, fetcher: Arc<ResilientFetcher>) -> Self {
        let cache = CoalescingCache::from_settings(&config.cache);

        let mut policy = CachePolicy::from_settings(&config.cache);
        if let Some(proxy) = &config.episode_proxy {
            policy = policy.with_rule(EPISODE_ROUTE, proxy.ttl_seconds);
        }

        let episodes = EpisodeSourceService::new(
            cache.clone(),
            Arc::clone(&fetcher),
            config.episode_proxy.clone(),
            config.fetch.user_agent.clone(),
        );

        log::info!(
            "Gateway core ready (max {} cache entries, {} fetch attempts)",
            config.cache.max_entries,
            config.fetch.max_attempts
        );

        Self {
            config,
            cache,
            fetcher,
            policy,
            episodes,
        }
    }
}
