//! Tracked fire-and-forget work.
//!
//! Cache writes must not block the response path, but a bare unawaited
//! spawn leaves nothing for shutdown to wait on. Spawning through this
//! set keeps every detached task joinable so `drain` can let pending
//! writes finish before the process exits.

use std::future::Future;

use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// A drainable set of detached background tasks.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    inner: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a task without waiting for it. Finished tasks are reaped
    /// on the way in so the set does not grow unbounded.
    pub async fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.inner.lock().await;
        while set.try_join_next().is_some() {}
        set.spawn(future);
    }

    /// Wait for every tracked task to finish.
    pub async fn drain(&self) {
        let mut set = self.inner.lock().await;
        while set.join_next().await.is_some() {}
    }

    /// Number of tasks not yet reaped (for tests).
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.len()
    }
}
