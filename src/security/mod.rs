//! Security subsystem: origin whitelisting, rate limiting, secrets.

pub mod origin;
pub mod rate_limit;
pub mod secrets;

pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use secrets::{EnvSecretStore, SecretStore, StaticSecretStore};
