#![allow(dead_code)]

//! Scripted upstream used by the integration tests

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tatakai_core::modules::fetch::{FetchRequest, HttpTransport, RetryPolicy, UpstreamResponse};
use tatakai_core::{GatewayError, GatewayResult, ResilientFetcher};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Json(u16, Value),
    Body(u16, &'static str),
    Fail(GatewayError),
    /// Never answers, so only the attempt timeout ends the call
    Hang,
}

/// Answers requests from a script; the last reply repeats once the script
/// runs out
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    calls: AtomicUsize,
    sent_at: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            sent_at: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Time between consecutive attempts
    pub fn gaps(&self) -> Vec<Duration> {
        let sent_at = self.sent_at.lock().unwrap();
        sent_at.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().unwrap_or(Reply::Status(200)),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &FetchRequest) -> GatewayResult<UpstreamResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent_at.lock().unwrap().push(Instant::now());
        self.requests.lock().unwrap().push(request.clone());

        match self.next_reply() {
            Reply::Status(status) => Ok(response(status, &request.url, b"{}".to_vec())),
            Reply::Json(status, body) => {
                Ok(response(status, &request.url, body.to_string().into_bytes()))
            }
            Reply::Body(status, body) => Ok(response(status, &request.url, body.as_bytes().to_vec())),
            Reply::Fail(error) => Err(error),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn response(status: u16, url: &str, body: Vec<u8>) -> UpstreamResponse {
    UpstreamResponse::new(
        StatusCode::from_u16(status).unwrap(),
        HeaderMap::new(),
        url,
        body,
    )
}

/// Fetcher with the default 500ms/x2 backoff and no jitter
pub fn fetcher_over(transport: Arc<ScriptedTransport>, max_attempts: u32) -> ResilientFetcher {
    let policy = RetryPolicy {
        max_attempts,
        ..RetryPolicy::default()
    };
    ResilientFetcher::with_transport(transport, policy, Duration::from_secs(30))
}
