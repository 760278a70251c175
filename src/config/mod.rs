//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml → loader.rs → validation.rs → schema types → registry.rs
//! ```
//!
//! The resulting `AppRegistry` is built once at startup and never
//! mutated afterwards; the request pipeline only reads it.

pub mod loader;
pub mod registry;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use registry::AppRegistry;
pub use schema::{
    ApiConfig, AppConfig, GatewayConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    RateLimitKey, TimeoutConfig, UpstreamMethod,
};
