use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A spawned task owned by one component and aborted when dropped.
///
/// Every timer the engine arms (auto-dismiss, success display) is held in one
/// of these so it cannot outlive its owner. Must be created inside a Tokio
/// runtime.
#[derive(Debug)]
pub struct ScopedTask {
    handle: JoinHandle<()>,
}

impl ScopedTask {
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Runs `future` once `delay` has elapsed.
    pub fn after<F>(delay: Duration, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            future.await;
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
