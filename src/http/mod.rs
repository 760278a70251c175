//! HTTP subsystem: server wiring, the request pipeline, and response
//! assembly.

pub mod pipeline;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
