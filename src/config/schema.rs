//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from TOML
//! config files, with per-section defaults so a partial file is usable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Registered apps and their proxied APIs.
    pub apps: Vec<AppConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests served concurrently; excess waits its turn.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Hard deadline for a single upstream call, in seconds.
    pub upstream_secs: u64,

    /// Total time for the inbound request/response, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 10,
            request_secs: 30,
        }
    }
}

/// Which identity rate-limit counters are keyed by.
///
/// Chosen once at startup, never per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKey {
    /// Client IP, taken from the edge-supplied client-IP header.
    #[default]
    Ip,
    /// The app segment of the route.
    App,
}

/// Rate limiting configuration (fixed window).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum requests per identifier per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Identifier selection.
    pub key: RateLimitKey,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
            key: RateLimitKey::Ip,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A registered app: a CORS whitelist plus the APIs it may call.
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// App identifier; first path segment of inbound routes.
    pub name: String,

    /// Allowed origins. An inbound Origin/Referer passes if it starts
    /// with any entry.
    pub origins: Vec<String>,

    /// Named API definitions; second path segment of inbound routes.
    #[serde(default)]
    pub apis: HashMap<String, ApiConfig>,
}

impl AppConfig {
    /// Look up an API definition by name.
    pub fn api(&self, name: &str) -> Option<&ApiConfig> {
        self.apis.get(name)
    }

    /// Sorted API names, for "valid alternatives" error payloads.
    pub fn api_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.apis.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Method used for the outbound upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum UpstreamMethod {
    #[default]
    Get,
    Post,
}

/// A single proxied API endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Upstream URL the request is forwarded to.
    pub url: String,

    /// Name of the credential in the secret store, resolved right
    /// before each upstream call.
    pub secret_ref: String,

    /// Outbound method.
    #[serde(default)]
    pub method: UpstreamMethod,

    /// Query parameters copied from the inbound request (GET). Unlisted
    /// params are dropped.
    #[serde(default)]
    pub allowed_params: Vec<String>,

    /// JSON body fields copied from the inbound request (POST).
    /// Unlisted fields are dropped.
    #[serde(default)]
    pub allowed_body_fields: Vec<String>,

    /// Response cache TTL in seconds; 0 disables caching.
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
            [[apps]]
            name = "myblog"
            origins = ["https://myblog.com", "http://localhost:3000"]

            [apps.apis.weather]
            url = "https://api.weather.example/v1/current"
            secret_ref = "WEATHER_API_KEY"
            allowed_params = ["q", "units"]
            cache_ttl_secs = 300
        "#;

        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.apps.len(), 1);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.timeouts.upstream_secs, 10);

        let app = &config.apps[0];
        let api = app.api("weather").unwrap();
        assert_eq!(api.method, UpstreamMethod::Get);
        assert_eq!(api.allowed_params, vec!["q", "units"]);
        assert_eq!(api.cache_ttl_secs, 300);
        assert!(app.api("nope").is_none());
    }

    #[test]
    fn parses_post_method_and_key_selection() {
        let toml = r#"
            [rate_limit]
            max_requests = 5
            window_secs = 10
            key = "app"

            [[apps]]
            name = "shop"
            origins = ["https://shop.example"]

            [apps.apis.checkout]
            url = "https://api.payments.example/charge"
            secret_ref = "PAYMENTS_KEY"
            method = "POST"
            allowed_body_fields = ["amount", "currency"]
        "#;

        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rate_limit.key, RateLimitKey::App);
        let api = config.apps[0].api("checkout").unwrap();
        assert_eq!(api.method, UpstreamMethod::Post);
        assert_eq!(api.allowed_body_fields, vec!["amount", "currency"]);
        assert_eq!(api.cache_ttl_secs, 0);
    }
}
