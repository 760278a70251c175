//! Outbound request construction and execution.
//!
//! # Responsibilities
//! - Build the upstream URL/body from the API definition
//! - Copy only whitelisted inbound params/fields (a security boundary:
//!   everything unlisted is silently dropped)
//! - Inject the secret as the `key` parameter/field
//! - Enforce the hard upstream deadline and translate failures
//!
//! # Design Decisions
//! - A malformed inbound JSON body is a recoverable condition yielding
//!   an empty allowed-field set, never a propagated parse error
//! - Timeout maps to 504, any other transport failure to 502
//! - Status and body come back raw; only the content type is
//!   normalized (`application/json` when the upstream omits it)

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use serde_json::Value;
use url::Url;

use crate::config::schema::{ApiConfig, UpstreamMethod};
use crate::error::GatewayError;

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Cap on the upstream response body; larger bodies become 502s.
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Raw result of a successful upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Whether the response qualifies for caching.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Issues outbound calls to the real APIs.
pub struct UpstreamForwarder {
    client: reqwest::Client,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }

    /// Forward one request. `raw_query` is the inbound query string,
    /// `raw_body` the inbound body; which one is consulted depends on
    /// the configured upstream method.
    pub async fn forward(
        &self,
        api: &ApiConfig,
        secret: &str,
        raw_query: &str,
        raw_body: &[u8],
    ) -> Result<UpstreamResponse, GatewayError> {
        let request = match api.method {
            UpstreamMethod::Get => {
                let url = build_get_url(api, secret, raw_query)?;
                self.client.get(url)
            }
            UpstreamMethod::Post => {
                let url = parse_base_url(api)?;
                let body = build_post_body(api, secret, raw_body);
                self.client.post(url).json(&body)
            }
        };

        let mut response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.translate(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.translate(e))? {
            if body.len() + chunk.len() > MAX_RESPONSE_BYTES {
                return Err(GatewayError::UpstreamFailed {
                    reason: format!("response body exceeds {MAX_RESPONSE_BYTES} bytes"),
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse {
            status,
            content_type,
            body: Bytes::from(body),
        })
    }

    fn translate(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::UpstreamTimeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            tracing::warn!(error = %error, "Upstream request failed");
            // The error's Display carries the full outbound URL, the
            // injected key included. Only the stripped form may reach a
            // client-facing message.
            GatewayError::UpstreamFailed {
                reason: error.without_url().to_string(),
            }
        }
    }
}

fn parse_base_url(api: &ApiConfig) -> Result<Url, GatewayError> {
    // Validated at load time; a failure here means the registry was
    // constructed without validation.
    Url::parse(&api.url).map_err(|e| GatewayError::Internal {
        reason: format!("invalid upstream url \"{}\": {}", api.url, e),
    })
}

/// Build the outbound GET URL: whitelisted inbound params in configured
/// order, then the injected `key`.
fn build_get_url(api: &ApiConfig, secret: &str, raw_query: &str) -> Result<Url, GatewayError> {
    let mut url = parse_base_url(api)?;
    let inbound: Vec<(String, String)> = url::form_urlencoded::parse(raw_query.as_bytes())
        .into_owned()
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        for name in &api.allowed_params {
            for (key, value) in inbound.iter().filter(|(key, _)| key == name) {
                pairs.append_pair(key, value);
            }
        }
        pairs.append_pair("key", secret);
    }

    Ok(url)
}

/// Build the outbound POST body: whitelisted inbound fields in
/// configured order plus the injected `key`. Unparseable inbound bodies
/// count as an empty object.
fn build_post_body(api: &ApiConfig, secret: &str, raw_body: &[u8]) -> Value {
    let inbound: serde_json::Map<String, Value> =
        serde_json::from_slice(raw_body).unwrap_or_default();

    let mut outbound = serde_json::Map::new();
    for field in &api.allowed_body_fields {
        if let Some(value) = inbound.get(field) {
            outbound.insert(field.clone(), value.clone());
        }
    }
    outbound.insert("key".to_string(), Value::String(secret.to_string()));

    Value::Object(outbound)
}
