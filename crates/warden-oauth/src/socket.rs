//! Serves the current access token over a Unix domain socket.
//!
//! Any `GET` (or `HEAD`) on the socket answers with the access token as
//! `text/plain`. Before a token is available the request gets a
//! `503 Service Unavailable`; the server itself keeps running.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::UnixListener;
use tower_http::trace::TraceLayer;

use crate::error::{Result, WardenError};
use crate::server::ServerHandle;
use crate::state::TokenState;

/// Token responder bound to a filesystem socket.
#[derive(Debug)]
pub struct SocketTokenServer {
    path: PathBuf,
    state: Arc<TokenState>,
    handle: Option<ServerHandle>,
}

impl SocketTokenServer {
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

    /// Bind the socket and start serving.
    ///
    /// A stale socket file is removed first; the new one is readable and
    /// writable by the owner only.
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(WardenError::AlreadyRunning);
        }

        tracing::debug!(path = %self.path.display(), "Starting socket listener");
        remove_stale_socket(&self.path)?;
        let listener = UnixListener::bind(&self.path)?;
        std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;

        let router = token_router(self.state.clone());
        self.handle = Some(ServerHandle::spawn("socket-listener", move |shutdown| async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                tracing::warn!(error = %e, "Socket listener failed");
            }
        }));

        tracing::info!(path = %self.path.display(), "Serving access token on socket");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(ServerHandle::is_running)
    }

    /// Shut the server down, wait for it and remove the socket file.
    pub async fn stop(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(WardenError::NoListener)?;
        handle.stop().await;
        remove_stale_socket(&self.path)
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn token_router(state: Arc<TokenState>) -> Router {
    Router::new()
        .route("/", get(serve_token))
        .route("/{*path}", get(serve_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn serve_token(State(state): State<Arc<TokenState>>) -> Response {
    match state.access_token() {
        Ok(token) => ([(header::CONTENT_TYPE, "text/plain")], token).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Token requested before one is available");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
                .into_response()
        }
    }
}
