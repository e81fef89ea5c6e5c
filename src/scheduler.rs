//! Cooperative task handles
//!
//! Recurring activities (frame loop, poll timer) run as tokio tasks that
//! check a shared [`CancellationToken`] before every state mutation. Dropping a
//! [`TaskHandle`] cancels its task.

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

/// Owner side of a spawned recurring task
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Spawn `future` on the runtime inside the current span; it must observe
    /// `token` itself
    pub fn spawn<F>(name: &'static str, token: CancellationToken, future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("Spawning task: {}", name);
        Self {
            name,
            token,
            join: Some(tokio::spawn(future.in_current_span())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the task to exit its loop
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                debug!("Task {} ended abnormally: {}", self.name, e);
            }
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dropping_handle_cancels() {
        let token = CancellationToken::new();
        let observed = token.clone();
        let handle = TaskHandle::spawn("idle", token.clone(), async move {
            token.cancelled().await;
        });
        assert_eq!(handle.name(), "idle");
        drop(handle);
        assert!(observed.is_cancelled());
    }

    #[tokio::test]
    async fn test_shutdown_joins() {
        let token = CancellationToken::new();
        let inner = token.clone();
        let handle = TaskHandle::spawn("loop", token, async move {
            while !inner.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("task should exit after cancel");
    }
}
