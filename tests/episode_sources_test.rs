//! Episode source resolution through the wired gateway core

mod utils;

use futures::future::join_all;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tatakai_core::{GatewayConfig, GatewayCore, GatewayError};
use utils::{fetcher_over, Reply, ScriptedTransport};

fn config() -> GatewayConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("EPISODE_PROXY_URL", "https://proxy.example/functions/v1/scraper"),
        ("EPISODE_PROXY_KEY", "test-key"),
        ("EPISODE_CACHE_TTL_SECS", "600"),
    ]);
    GatewayConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
        .expect("test configuration is valid")
}

fn core(transport: Arc<ScriptedTransport>) -> GatewayCore {
    GatewayCore::with_fetcher(config(), Arc::new(fetcher_over(transport, 3)))
}

fn sources() -> Value {
    json!({
        "sources": [
            { "url": "https://cdn.example/hi.m3u8", "language": "hin", "isM3U8": true },
            { "url": "https://cdn.example/ja.m3u8", "language": "Japanese", "isM3U8": true }
        ],
        "subtitles": []
    })
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_for_one_episode_hit_the_proxy_once() {
    let transport = ScriptedTransport::new([Reply::Json(200, sources())]);
    let core = core(transport.clone());

    let requests = (0..6).map(|i| {
        let identifier = if i % 2 == 0 {
            "naruto-shippuden-1x1".to_string()
        } else {
            "https://watchanimeworld.in/episode/naruto-shippuden-1x1/".to_string()
        };
        let episodes = &core.episodes;
        async move { episodes.episode_sources(&identifier).await }
    });

    let results = join_all(requests).await;
    assert_eq!(transport.calls(), 1);
    for result in &results {
        let data = result.as_ref().expect("sources should resolve");
        assert_eq!(data["sources"][0]["langCode"], "hi");
        assert_eq!(data["sources"][1]["isDub"], false);
    }

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(
        request.url,
        "https://proxy.example/functions/v1/scraper?episodeUrl=naruto-shippuden-1x1"
    );
    let body: Value = serde_json::from_slice(request.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({ "name": "Tatakai Proxy" }));

    // The proxy answers instantly, so later callers may join or hit
    let stats = core.cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits + stats.coalesced, 5);
}

#[tokio::test(start_paused = true)]
async fn proxy_outage_is_retried_then_reported() {
    let transport = ScriptedTransport::new([Reply::Status(502)]);
    let core = core(transport.clone());

    let result = core.episodes.episode_sources("bleach-1x1").await;
    assert!(matches!(result, Err(GatewayError::UpstreamUnavailable(_))));
    assert_eq!(transport.calls(), 3);
    assert!(core.cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn non_json_proxy_answer_is_an_extraction_failure() {
    let transport = ScriptedTransport::new([Reply::Body(200, "<html>Just a moment...</html>")]);
    let core = core(transport.clone());

    let result = core.episodes.episode_sources("bleach-1x1").await;
    assert!(matches!(result, Err(GatewayError::ExtractionFailure(_))));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn episode_route_uses_the_episode_ttl() {
    let core = core(ScriptedTransport::new(Vec::new()));
    let directive = core
        .policy
        .resolve("/api/v1/watchaw/episode", &[("id", "naruto-shippuden-1x1")]);

    assert_eq!(directive.ttl_seconds, 600);
    assert_eq!(directive.key, "/api/v1/watchaw/episode?id=naruto-shippuden-1x1");
    assert_eq!(core.policy.ttl_for("/api/v1/hianime/home"), 300);
}
