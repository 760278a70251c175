//! Upstream forwarding.

pub mod forwarder;

pub use forwarder::{UpstreamForwarder, UpstreamResponse};
