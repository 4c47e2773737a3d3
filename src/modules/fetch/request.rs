use crate::shared::errors::{GatewayError, GatewayResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A single logical upstream request, replayable across retry attempts
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// POST with a JSON body and matching content type
    pub fn post_json(url: impl Into<String>, body: &Value) -> GatewayResult<Self> {
        let mut request = Self {
            method: Method::POST,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Some(serde_json::to_vec(body)?),
        };
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(request)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge a header set into the request, later values win
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }
}

/// Fully buffered upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: String,
    body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            url: url.into(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON; a body that does not decode means the upstream
    /// changed shape, which no retry will fix
    pub fn json<T: DeserializeOwned>(&self) -> GatewayResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let text = self.text();
            GatewayError::ExtractionFailure(format!(
                "Failed to parse response from {}: {}. Response: {}",
                self.url,
                e,
                if text.len() > 200 {
                    format!("{}...", text.chars().take(200).collect::<String>())
                } else {
                    text
                }
            ))
        })
    }

    /// Turn an authoritative non-success answer into an error
    pub fn error_for_status(self) -> GatewayResult<Self> {
        let status = self.status;
        if status.is_success() || status == StatusCode::FOUND {
            return Ok(self);
        }

        match status {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(self.url)),
            StatusCode::TOO_MANY_REQUESTS => Err(GatewayError::RateLimited(self.url)),
            s if s.is_client_error() => Err(GatewayError::RequestRejected {
                status: s.as_u16(),
                message: format!("{} answered {}", self.url, s),
            }),
            s => Err(GatewayError::UpstreamUnavailable(format!(
                "{} answered {}",
                self.url, s
            ))),
        }
    }
}

/// Header preset that satisfies the upstream sites' browser checks
#[derive(Debug, Clone)]
pub struct BrowserHeaders {
    user_agent: String,
    accept: &'static str,
    referer: Option<String>,
}

impl BrowserHeaders {
    pub fn html(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept: "text/html,application/xhtml+xml",
            referer: None,
        }
    }

    pub fn json(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept: "application/json",
            referer: None,
        }
    }

    /// Send `Referer` and `Origin` for the given site
    pub fn with_referer(mut self, site: impl Into<String>) -> Self {
        self.referer = Some(site.into());
        self
    }

    pub fn into_header_map(self) -> GatewayResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));

        if let Some(site) = self.referer {
            let origin = site.trim_end_matches('/');
            headers.insert(REFERER, header_value(&site)?);
            headers.insert(ORIGIN, header_value(origin)?);
        }

        Ok(headers)
    }
}

pub(crate) fn header_value(raw: &str) -> GatewayResult<HeaderValue> {
    HeaderValue::from_str(raw)
        .map_err(|e| GatewayError::InvalidInput(format!("Invalid header value '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> UpstreamResponse {
        UpstreamResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            "https://upstream.example/page",
            body.as_bytes().to_vec(),
        )
    }

    #[test]
    fn test_post_json_sets_body_and_content_type() {
        let request =
            FetchRequest::post_json("https://proxy.example", &json!({"name": "x"})).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.body.unwrap(), br#"{"name":"x"}"#.to_vec());
    }

    #[test]
    fn test_browser_headers_with_referer() {
        let headers = BrowserHeaders::html("agent/1.0")
            .with_referer("https://animelok.to/")
            .into_header_map()
            .unwrap();

        assert_eq!(headers[USER_AGENT], "agent/1.0");
        assert_eq!(headers[ACCEPT], "text/html,application/xhtml+xml");
        assert_eq!(headers[REFERER], "https://animelok.to/");
        assert_eq!(headers[ORIGIN], "https://animelok.to");
    }

    #[test]
    fn test_invalid_user_agent_is_rejected() {
        let result = BrowserHeaders::json("bad\nagent").into_header_map();
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
    }

    #[test]
    fn test_json_decode_failure_is_extraction_failure() {
        let err = response(200, "<html>changed</html>")
            .json::<Value>()
            .unwrap_err();
        assert!(matches!(err, GatewayError::ExtractionFailure(_)));
    }

    #[test]
    fn test_error_for_status() {
        assert!(response(200, "ok").error_for_status().is_ok());
        assert!(matches!(
            response(403, "").error_for_status(),
            Err(GatewayError::RequestRejected { status: 403, .. })
        ));
        assert!(matches!(
            response(404, "").error_for_status(),
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            response(503, "").error_for_status(),
            Err(GatewayError::UpstreamUnavailable(_))
        ));
    }
}
