use crate::modules::cache::CoalescingCache;
use crate::modules::fetch::request::header_value;
use crate::modules::fetch::{BrowserHeaders, FetchRequest, ResilientFetcher};
use crate::modules::identifier::{normalize_language, IdentifierParser, ParsedIdentifier};
use crate::shared::config::EpisodeProxySettings;
use crate::shared::errors::{GatewayError, GatewayResult};
use crate::shared::utils::logger::{LogContext, TimedOperation};
use reqwest::header::{HeaderName, AUTHORIZATION};
use serde_json::{json, Value};
use std::sync::Arc;

const PROXY_CLIENT_NAME: &str = "Tatakai Proxy";

/// Resolves playable sources for an episode slug through the remote proxy
/// function, memoized per slug
pub struct EpisodeSourceService {
    cache: CoalescingCache<Value>,
    fetcher: Arc<ResilientFetcher>,
    proxy: Option<EpisodeProxySettings>,
    parser: IdentifierParser,
    user_agent: String,
}

impl EpisodeSourceService {
    pub fn new(
        cache: CoalescingCache<Value>,
        fetcher: Arc<ResilientFetcher>,
        proxy: Option<EpisodeProxySettings>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            proxy,
            parser: IdentifierParser::default(),
            user_agent: user_agent.into(),
        }
    }

    /// Use a different episode site for canonical URLs
    pub fn with_parser(mut self, parser: IdentifierParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn cache_key(slug: &str) -> String {
        format!("watchaw:episode:{}", slug)
    }

    pub fn parse(&self, identifier: &str) -> GatewayResult<ParsedIdentifier> {
        self.parser.parse(identifier).ok_or_else(|| {
            GatewayError::InvalidInput(format!("Invalid episode URL/slug format: {}", identifier))
        })
    }

    /// Sources for an episode given as a slug or full episode URL
    pub async fn episode_sources(&self, identifier: &str) -> GatewayResult<Value> {
        let parsed = self.parse(identifier)?;
        let proxy = self.proxy.clone().ok_or_else(|| {
            GatewayError::ConfigError("Episode proxy is not configured".to_string())
        })?;

        log::info!("Episode: Fetching sources for '{}'", parsed.raw_slug);
        let timer = TimedOperation::new(&format!("episode sources {}", parsed.raw_slug));

        let fetcher = Arc::clone(&self.fetcher);
        let user_agent = self.user_agent.clone();
        let slug = parsed.raw_slug.clone();
        let ttl_seconds = proxy.ttl_seconds;

        let result = self
            .cache
            .get_or_set(Self::cache_key(&parsed.raw_slug), ttl_seconds, move || async move {
                let request = proxy_request(&proxy, &slug, &user_agent)?;
                let mut payload: Value = fetcher.fetch(&request).await?.error_for_status()?.json()?;
                tag_source_languages(&mut payload);
                Ok(payload)
            })
            .await;

        match &result {
            Ok(_) => {
                timer.finish();
            }
            Err(error) => LogContext::error_with_context(error, "Episode proxy failed"),
        }
        result
    }
}

fn proxy_request(
    proxy: &EpisodeProxySettings,
    slug: &str,
    user_agent: &str,
) -> GatewayResult<FetchRequest> {
    let url = format!(
        "{}?episodeUrl={}",
        proxy.url.trim_end_matches('/'),
        urlencoding::encode(slug)
    );

    Ok(FetchRequest::post_json(url, &json!({ "name": PROXY_CLIENT_NAME }))?
        .with_headers(BrowserHeaders::json(user_agent).into_header_map()?)
        .with_header(AUTHORIZATION, header_value(&format!("Bearer {}", proxy.key))?)
        .with_header(HeaderName::from_static("apikey"), header_value(&proxy.key)?))
}

/// Add `langCode` and `isDub` to every source that carries a language label
fn tag_source_languages(payload: &mut Value) {
    let Some(sources) = payload.get_mut("sources").and_then(Value::as_array_mut) else {
        return;
    };

    for source in sources.iter_mut().filter_map(Value::as_object_mut) {
        let Some(label) = source.get("language").and_then(Value::as_str) else {
            continue;
        };
        let tag = normalize_language(label);
        source.insert("langCode".to_string(), Value::String(tag.code));
        source.insert("isDub".to_string(), Value::Bool(tag.is_dub));
    }
}
