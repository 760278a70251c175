//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router and wire the pipeline handlers
//! - Build shared application state (registry, limiter, cache,
//!   forwarder, secrets, background tasks)
//! - Apply middleware (request timeout, trace layer, concurrency cap)
//! - Serve with graceful shutdown, draining background cache writes

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::cache::ResponseCache;
use crate::config::registry::AppRegistry;
use crate::config::schema::{GatewayConfig, RateLimitKey};
use crate::http::pipeline::{invalid_route_handler, preflight_handler, proxy_handler};
use crate::lifecycle::{shutdown_signal, BackgroundTasks};
use crate::security::rate_limit::RateLimiter;
use crate::security::secrets::SecretStore;
use crate::upstream::UpstreamForwarder;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AppRegistry>,
    pub limiter: Arc<RateLimiter>,
    pub cache: Arc<ResponseCache>,
    pub forwarder: Arc<UpstreamForwarder>,
    pub secrets: Arc<dyn SecretStore>,
    pub tasks: Arc<BackgroundTasks>,
    pub rate_key: RateLimitKey,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    tasks: Arc<BackgroundTasks>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and
    /// secret store.
    pub fn new(config: GatewayConfig, secrets: Arc<dyn SecretStore>) -> Self {
        let registry = Arc::new(AppRegistry::from_config(config.apps.clone()));
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.max_requests,
            Duration::from_secs(config.rate_limit.window_secs),
        ));
        let cache = Arc::new(ResponseCache::new());
        let forwarder = Arc::new(UpstreamForwarder::new(Duration::from_secs(
            config.timeouts.upstream_secs,
        )));
        let tasks = Arc::new(BackgroundTasks::new());

        let state = AppState {
            registry,
            limiter,
            cache,
            forwarder,
            secrets,
            tasks: tasks.clone(),
            rate_key: config.rate_limit.key,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            tasks,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let proxied = get(proxy_handler)
            .post(proxy_handler)
            .options(preflight_handler);

        Router::new()
            .route("/{app}/{api}", proxied.clone())
            .route("/{app}/{api}/{*rest}", proxied)
            .fallback(invalid_route_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(GlobalConcurrencyLimitLayer::new(
                config.listener.max_connections,
            ))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            apps = self.config.apps.len(),
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Let pending fire-and-forget cache writes finish.
        self.tasks.drain().await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
