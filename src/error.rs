//! Gateway error taxonomy.
//!
//! Every failure in the request pipeline collapses into one of these
//! variants at the pipeline boundary and leaves the process as a JSON
//! error response; nothing propagates to the client as anything but a
//! well-formed HTTP response.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors produced by the request pipeline.
///
/// `label()` is the stable wire value of the `error` field; the
/// `Display` impl carries the human-readable detail sent as `message`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Path had fewer than two non-empty segments.
    #[error("path must be /{{app}}/{{api}}")]
    InvalidRoute,

    /// App name not present in the registry.
    #[error("no app named \"{name}\" is configured")]
    UnknownApp { name: String, available: Vec<String> },

    /// API name not present in the app's registry.
    #[error("app \"{app}\" has no API named \"{name}\"")]
    UnknownApi {
        app: String,
        name: String,
        available: Vec<String>,
    },

    /// Origin/Referer not whitelisted for the app.
    #[error("origin is not allowed for this app")]
    Forbidden,

    /// Fixed-window quota exhausted for the identifier.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Secret missing from the secret store.
    #[error("secret \"{secret_ref}\" is not available")]
    MissingSecret { secret_ref: String },

    /// Upstream call exceeded the hard deadline.
    #[error("upstream did not respond within {timeout_secs}s")]
    UpstreamTimeout { timeout_secs: u64 },

    /// Upstream call failed for any other transport reason.
    #[error("upstream request failed: {reason}")]
    UpstreamFailed { reason: String },

    /// Anything unanticipated.
    #[error("{reason}")]
    Internal { reason: String },
}

impl GatewayError {
    /// Stable value of the `error` field in the JSON error body.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidRoute => "Invalid route",
            Self::UnknownApp { .. } => "Unknown app",
            Self::UnknownApi { .. } => "Unknown API endpoint",
            Self::Forbidden => "Forbidden",
            Self::RateLimited { .. } => "Too Many Requests",
            Self::MissingSecret { .. } => "Configuration error",
            Self::UpstreamTimeout { .. } => "Gateway timeout",
            Self::UpstreamFailed { .. } => "Bad gateway",
            Self::Internal { .. } => "Internal server error",
        }
    }

    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRoute | Self::UnknownApp { .. } | Self::UnknownApi { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::MissingSecret { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}
