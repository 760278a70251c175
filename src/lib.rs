//! StatEnv Gateway library.
//!
//! An edge API gateway that forwards whitelisted browser requests to
//! secret-bearing third-party APIs, keeping credentials server-side.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upstream;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use security::secrets::{EnvSecretStore, SecretStore, StaticSecretStore};
