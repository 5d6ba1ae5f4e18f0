//! Mirrors the current access token into a plaintext file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, WardenError};
use crate::fsutil::write_atomic;
use crate::server::ServerHandle;
use crate::state::TokenState;

/// Write the current access token to `path` once.
pub fn write_access_token(state: &TokenState, path: &Path) -> Result<()> {
    let access_token = state.access_token()?;
    write_atomic(path, access_token.as_bytes())
}

/// Background task rewriting a file every time the access token changes.
#[derive(Debug)]
pub struct FileWriterDaemon {
    path: PathBuf,
    state: Arc<TokenState>,
    handle: Option<ServerHandle>,
}

impl FileWriterDaemon {
    pub fn new(path: impl Into<PathBuf>, state: Arc<TokenState>) -> Self {
        Self {
            path: path.into(),
            state,
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(WardenError::AlreadyRunning);
        }

        tracing::debug!(path = %self.path.display(), "Starting token file writer");
        let path = self.path.clone();
        let state = self.state.clone();
        self.handle = Some(ServerHandle::spawn("file-writer", move |shutdown| {
            write_loop(path, state, shutdown)
        }));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(ServerHandle::is_running)
    }

    /// Stop the loop even if no token change ever arrives, and wait for it.
    pub async fn stop(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(WardenError::NoListener)?;
        handle.stop().await;
        Ok(())
    }
}

async fn write_loop(path: PathBuf, state: Arc<TokenState>, shutdown: CancellationToken) {
    let mut last_seen: Option<String> = None;

    loop {
        let token = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            token = state.wait_for_change(last_seen.as_deref()) => match token {
                Some(token) => token,
                None => break,
            },
        };

        tracing::info!(path = %path.display(), "Writing out new access token");
        let target = path.clone();
        let contents = token.access_token.clone();
        match tokio::task::spawn_blocking(move || write_atomic(&target, contents.as_bytes())).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to write token file");
            }
            Err(e) => tracing::error!(error = %e, "Token file write task failed"),
        }
        last_seen = Some(token.access_token);
    }

    tracing::debug!("Token file writer exiting");
}
