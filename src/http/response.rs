//! Response assembly.
//!
//! # Responsibilities
//! - Compose the final success response (upstream or cached body plus
//!   gateway, CORS, cache and rate-limit headers)
//! - Convert every `GatewayError` into a JSON error body
//! - Build the CORS preflight response
//!
//! # Design Decisions
//! - Errors raised before origin validation carry
//!   `Access-Control-Allow-Origin: *`; later ones echo the caller
//! - 429 responses additionally carry `Retry-After` and the rate-limit
//!   headers so well-behaved clients can back off precisely

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::security::RateLimitDecision;

pub const X_STATENV_APP: &str = "x-statenv-app";
pub const X_STATENV_API: &str = "x-statenv-api";
pub const X_CACHE: &str = "x-cache";
pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const ALLOWED_HEADERS: &str = "Content-Type";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Whether the body came from the cache or went upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// Everything the success path needs besides the body itself.
pub struct SuccessContext<'a> {
    pub app: &'a str,
    pub api: &'a str,
    pub origin: &'a str,
    pub cache_ttl_secs: u64,
    pub cache_status: CacheStatus,
    pub rate: &'a RateLimitDecision,
}

/// Compose a success response around an upstream (or cached) body.
pub fn assemble_success(
    ctx: &SuccessContext<'_>,
    status: StatusCode,
    content_type: &str,
    body: Bytes,
) -> Response {
    let cache_control = if ctx.cache_ttl_secs > 0 {
        format!("public, max-age={}", ctx.cache_ttl_secs)
    } else {
        "no-cache".to_string()
    };

    let builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, sanitize(content_type))
        .header(X_STATENV_APP, sanitize(ctx.app))
        .header(X_STATENV_API, sanitize(ctx.api))
        .header(X_CACHE, ctx.cache_status.as_str())
        .header(header::CACHE_CONTROL, cache_control)
        .header(X_RATELIMIT_LIMIT, ctx.rate.limit.to_string())
        .header(X_RATELIMIT_REMAINING, ctx.rate.remaining.to_string())
        .header(X_RATELIMIT_RESET, ctx.rate.reset_epoch_secs().to_string())
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, sanitize(ctx.origin))
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS);

    finish(builder, Body::from(body))
}

/// Convert an error into its JSON response.
///
/// `origin` is the value to echo back (None before validation);
/// `rate` attaches rate-limit headers on 429.
pub fn assemble_error(
    error: &GatewayError,
    origin: Option<&str>,
    rate: Option<&RateLimitDecision>,
) -> Response {
    let mut fields = serde_json::Map::new();
    fields.insert("error".into(), json!(error.label()));
    fields.insert("message".into(), json!(error.to_string()));
    match error {
        GatewayError::UnknownApp { available, .. } => {
            fields.insert("apps".into(), json!(available));
        }
        GatewayError::UnknownApi { available, .. } => {
            fields.insert("endpoints".into(), json!(available));
        }
        GatewayError::RateLimited { retry_after_secs } => {
            fields.insert("retry_after".into(), json!(retry_after_secs));
        }
        _ => {}
    }

    let mut builder = Response::builder()
        .status(error.status())
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            sanitize(origin.unwrap_or("*")),
        );

    if let GatewayError::RateLimited { retry_after_secs } = error {
        builder = builder.header(header::RETRY_AFTER, retry_after_secs.to_string());
        if let Some(rate) = rate {
            builder = builder
                .header(X_RATELIMIT_LIMIT, rate.limit.to_string())
                .header(X_RATELIMIT_REMAINING, rate.remaining.to_string())
                .header(X_RATELIMIT_RESET, rate.reset_epoch_secs().to_string());
        }
    }

    let body = serde_json::to_vec(&Value::Object(fields)).unwrap_or_default();
    finish(builder, Body::from(body))
}

/// 204 CORS preflight response.
pub fn assemble_preflight(origin: Option<&str>) -> Response {
    let builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            sanitize(origin.unwrap_or("*")),
        )
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS)
        .header(header::ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE);

    finish(builder, Body::empty())
}

/// Header values come from config and inbound paths; anything a
/// `HeaderValue` rejects is replaced rather than failing the response.
fn sanitize(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("*"))
}

fn finish(builder: axum::http::response::Builder, body: Body) -> Response {
    builder.body(body).unwrap_or_else(|_| {
        let mut response = Response::new(Body::from("internal error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
