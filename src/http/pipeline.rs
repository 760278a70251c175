//! The per-request pipeline.
//!
//! Fixed stage order, each stage a terminal exit on failure:
//!
//! ```text
//! parse route → resolve app → resolve API → validate origin
//!   → rate limit → cache lookup (hit → assemble)
//!   → resolve secret → forward → cache store (async) → assemble
//! ```
//!
//! Every exit goes through the response assembler; nothing escapes as
//! anything but a well-formed HTTP response, and nothing is retried.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, Method, Request};
use axum::response::Response;
use uuid::Uuid;

use crate::cache;
use crate::config::schema::RateLimitKey;
use crate::error::GatewayError;
use crate::http::response::{
    assemble_error, assemble_preflight, assemble_success, CacheStatus, SuccessContext,
};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::origin;

/// Cap on how much of an inbound body is read.
const MAX_INBOUND_BODY: usize = 2 * 1024 * 1024;

/// Main pipeline handler for GET/POST.
pub async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Handling request"
    );

    // ParseRoute. The router only dispatches two-segment paths here,
    // but the fallback shares this handler's error shape.
    let Some((app_name, api_name)) = parse_route(&path) else {
        return conclude(&method, "none", start, assemble_error(&GatewayError::InvalidRoute, None, None));
    };

    // ResolveApp.
    let Some(app) = state.registry.app(&app_name) else {
        tracing::warn!(request_id = %request_id, app = %app_name, "Unknown app");
        let error = GatewayError::UnknownApp {
            name: app_name.clone(),
            available: state.registry.app_names(),
        };
        return conclude(&method, "none", start, assemble_error(&error, None, None));
    };

    // ResolveApi.
    let Some(api) = app.api(&api_name).cloned() else {
        tracing::warn!(request_id = %request_id, app = %app_name, api = %api_name, "Unknown API endpoint");
        let error = GatewayError::UnknownApi {
            app: app_name.clone(),
            name: api_name.clone(),
            available: app.api_names(),
        };
        return conclude(&method, &app_name, start, assemble_error(&error, None, None));
    };

    // ValidateOrigin.
    let origin_header = header_str(request.headers(), header::ORIGIN).map(str::to_owned);
    let referer_header = header_str(request.headers(), header::REFERER).map(str::to_owned);
    if !origin::is_allowed(&app, origin_header.as_deref(), referer_header.as_deref()) {
        tracing::warn!(
            request_id = %request_id,
            app = %app_name,
            origin = origin_header.as_deref().unwrap_or("-"),
            referer = referer_header.as_deref().unwrap_or("-"),
            "Origin not allowed"
        );
        return conclude(
            &method,
            &app_name,
            start,
            assemble_error(&GatewayError::Forbidden, None, None),
        );
    }
    let echo_origin = origin_header.as_deref().unwrap_or("*").to_string();

    // RateLimit. Evaluated on every request, cache hit or miss.
    let identifier = match state.rate_key {
        RateLimitKey::Ip => client_ip(request.headers(), addr),
        RateLimitKey::App => app_name.clone(),
    };
    let rate = state.limiter.check(&identifier);
    if !rate.allowed {
        tracing::warn!(request_id = %request_id, identifier = %identifier, "Rate limit exceeded");
        metrics::record_rate_limited(&app_name);
        let error = GatewayError::RateLimited {
            retry_after_secs: rate.retry_after_secs(),
        };
        return conclude(
            &method,
            &app_name,
            start,
            assemble_error(&error, Some(&echo_origin), Some(&rate)),
        );
    }

    // CacheLookup.
    let cache_key = cache::request_key(&method, request.uri());
    let cacheable = api.cache_ttl_secs > 0;
    if cacheable {
        if let Some(hit) = state.cache.lookup(&cache_key) {
            tracing::debug!(request_id = %request_id, key = %cache_key, "Cache hit");
            metrics::record_cache("hit");
            let ctx = SuccessContext {
                app: &app_name,
                api: &api_name,
                origin: &echo_origin,
                cache_ttl_secs: api.cache_ttl_secs,
                cache_status: CacheStatus::Hit,
                rate: &rate,
            };
            let response = assemble_success(&ctx, hit.status, &hit.content_type, hit.body);
            return conclude(&method, &app_name, start, response);
        }
        metrics::record_cache("miss");
    }

    // ResolveSecret, immediately before the call.
    let Some(secret) = state.secrets.get(&api.secret_ref) else {
        tracing::error!(request_id = %request_id, secret_ref = %api.secret_ref, "Secret not configured");
        let error = GatewayError::MissingSecret {
            secret_ref: api.secret_ref.clone(),
        };
        return conclude(
            &method,
            &app_name,
            start,
            assemble_error(&error, Some(&echo_origin), None),
        );
    };

    // Forward.
    let raw_query = request.uri().query().unwrap_or("").to_string();
    let raw_body = axum::body::to_bytes(request.into_body(), MAX_INBOUND_BODY)
        .await
        .unwrap_or_default();

    match state.forwarder.forward(&api, &secret, &raw_query, &raw_body).await {
        Ok(upstream) => {
            // CacheStore: fire-and-forget, tracked for shutdown drain.
            if cacheable && upstream.is_success() {
                let cache = state.cache.clone();
                let ttl = Duration::from_secs(api.cache_ttl_secs);
                let (status, content_type, body) =
                    (upstream.status, upstream.content_type.clone(), upstream.body.clone());
                state
                    .tasks
                    .spawn(async move {
                        cache.store(cache_key, status, content_type, body, ttl);
                    })
                    .await;
            }

            let ctx = SuccessContext {
                app: &app_name,
                api: &api_name,
                origin: &echo_origin,
                cache_ttl_secs: api.cache_ttl_secs,
                cache_status: CacheStatus::Miss,
                rate: &rate,
            };
            let response =
                assemble_success(&ctx, upstream.status, &upstream.content_type, upstream.body);
            conclude(&method, &app_name, start, response)
        }
        Err(error) => {
            tracing::error!(
                request_id = %request_id,
                app = %app_name,
                api = %api_name,
                error = %error,
                "Upstream call failed"
            );
            conclude(
                &method,
                &app_name,
                start,
                assemble_error(&error, Some(&echo_origin), None),
            )
        }
    }
}

/// OPTIONS handler. Always 204; the origin is echoed when the app
/// exists and whitelists it, `*` otherwise. Enforcement happens on the
/// actual request.
pub async fn preflight_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let origin_header = header_str(request.headers(), header::ORIGIN);
    let referer_header = header_str(request.headers(), header::REFERER);

    let validated = parse_route(request.uri().path())
        .and_then(|(app_name, _)| state.registry.app(&app_name))
        .is_some_and(|app| origin::is_allowed(&app, origin_header, referer_header));

    assemble_preflight(if validated { origin_header } else { None })
}

/// Fallback for paths with fewer than two non-empty segments.
pub async fn invalid_route_handler() -> Response {
    assemble_error(&GatewayError::InvalidRoute, None, None)
}

/// Split a path into its app/api segments. Extra segments are ignored;
/// fewer than two non-empty ones is an invalid route.
fn parse_route(path: &str) -> Option<(String, String)> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let app = segments.next()?;
    let api = segments.next()?;
    Some((app.to_string(), api.to_string()))
}

/// Rate-limit identity: the edge-supplied client IP header, falling
/// back to the proxy chain header, then the socket peer.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    if let Some(ip) = header_str_by_name(headers, "cf-connecting-ip") {
        return ip.to_string();
    }
    if let Some(forwarded) = header_str_by_name(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    addr.ip().to_string()
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_str_by_name<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn conclude(method: &Method, app: &str, start: Instant, response: Response) -> Response {
    metrics::record_request(method.as_str(), response.status().as_u16(), app, start);
    response
}
