//! Process lifecycle: shutdown signal and background-work tracking.

pub mod tasks;

pub use tasks::BackgroundTasks;

/// Wait for the shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
