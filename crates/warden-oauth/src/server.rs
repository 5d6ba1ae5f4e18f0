//! Start/stop handle shared by the background servers.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running background task that stops on request.
///
/// [`stop`](Self::stop) signals a graceful shutdown and then waits for the
/// task to exit, so the caller never proceeds while it is still serving.
#[derive(Debug)]
pub struct ServerHandle {
    name: &'static str,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Spawn `run`, handing it the token it must watch for shutdown.
    pub fn spawn<F, Fut>(name: &'static str, run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run(shutdown.clone()));
        Self {
            name,
            shutdown,
            task,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal shutdown and wait for the task to finish.
    pub async fn stop(self) {
        tracing::debug!(server = self.name, "Telling server to shut down");
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(server = self.name, error = %e, "Server task ended abnormally");
        }
        tracing::debug!(server = self.name, "Server has shut down");
    }
}
