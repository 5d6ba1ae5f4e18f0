//! Capture of the authorization redirect.
//!
//! Two sources race to deliver the redirect URL: a short-lived HTTP
//! listener on the loopback interface (the browser is redirected to it)
//! and lines the user pastes on the terminal. Both publish into one
//! [`CaptureSlot`]; the first valid URL wins and every later one is told
//! the redirect was already provided.

use std::io::Write;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{Method, Uri},
    response::Html,
    routing::get,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::error::{Result, WardenError};
use crate::server::ServerHandle;

/// How often the manual-entry side re-checks whether the listener won.
pub const MANUAL_POLL_INTERVAL: Duration = Duration::from_millis(500);

const REDIRECT_COMPLETED: &str = "Authorization redirect completed. You may close this window.";
const ALREADY_PROVIDED: &str =
    "The authorization redirect has already been provided and this server will shut down shortly.";
const INVALID_REQUEST: &str = "The requested URI does not represent an authorization redirect.";

/// Accept `candidate` only if it is a URL whose query carries a non-empty
/// `code` parameter.
pub fn validate_redirect(candidate: &str) -> Result<Url> {
    let url = Url::parse(candidate.trim())
        .map_err(|e| WardenError::InvalidRedirect(format!("Not a URL: {}", e)))?;
    if url.query_pairs().any(|(k, v)| k == "code" && !v.is_empty()) {
        Ok(url)
    } else {
        Err(WardenError::InvalidRedirect(
            "No authcode provided.".to_string(),
        ))
    }
}

/// Where the winning redirect came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Listener,
    Manual,
}

/// The accepted authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRedirect {
    pub url: Url,
    pub source: CaptureSource,
}

impl CapturedRedirect {
    pub fn code(&self) -> Option<String> {
        self.query_value("code")
    }

    pub fn state(&self) -> Option<String> {
        self.query_value("state")
    }

    fn query_value(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

/// Result of offering a URL to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    AlreadyProvided,
}

/// Single-assignment slot for the authorization redirect.
#[derive(Debug, Default)]
pub struct CaptureSlot {
    result: Mutex<Option<CapturedRedirect>>,
    notify: Notify,
}

impl CaptureSlot {
    /// Store `url` unless a redirect was already accepted.
    pub fn offer(&self, url: Url, source: CaptureSource) -> Offer {
        {
            let mut slot = self.result.lock();
            if slot.is_some() {
                return Offer::AlreadyProvided;
            }
            *slot = Some(CapturedRedirect { url, source });
        }
        tracing::debug!(?source, "Authorization redirect captured");
        self.notify.notify_one();
        Offer::Accepted
    }

    pub fn get(&self) -> Option<CapturedRedirect> {
        self.result.lock().clone()
    }

    /// Resolves after the next accepted offer (or immediately if one
    /// happened since the last call).
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Spawn a thread that forwards terminal lines into a channel.
///
/// The thread blocks on stdin, so it is a plain OS thread rather than a
/// runtime task; it exits on EOF or once the receiver is gone.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        loop {
            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Listener (optional) plus slot for one authorization attempt.
#[derive(Debug)]
pub struct RedirectCaptureServer {
    slot: Arc<CaptureSlot>,
    listener: Option<(SocketAddr, ServerHandle)>,
}

impl RedirectCaptureServer {
    /// Start an HTTP listener on `127.0.0.1:port`; port 0 picks a free one.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).await?;
        let addr = listener.local_addr()?;
        let slot = Arc::new(CaptureSlot::default());
        let router = redirect_router(slot.clone());

        let handle = ServerHandle::spawn("redirect-listener", move |shutdown| async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                tracing::warn!(error = %e, "Redirect listener failed");
            }
        });

        tracing::info!(port = addr.port(), "Redirect listener started");
        Ok(Self {
            slot,
            listener: Some((addr, handle)),
        })
    }

    /// No listener: the redirect can only be pasted by the user.
    pub fn manual_only() -> Self {
        Self {
            slot: Arc::new(CaptureSlot::default()),
            listener: None,
        }
    }

    pub fn port(&self) -> Result<u16> {
        self.listener
            .as_ref()
            .map(|(addr, _)| addr.port())
            .ok_or(WardenError::NoListener)
    }

    /// Redirect URI pointing at the listener, if there is one.
    pub fn redirect_uri(&self) -> Option<String> {
        self.port()
            .ok()
            .map(|port| format!("http://localhost:{}/", port))
    }

    /// Guidance for the user, including the SSH forward for remote sessions.
    pub fn instructions(&self) -> Option<String> {
        let port = self.port().ok()?;
        Some(format!(
            "A listener has been started at localhost:{port}. When you follow the link, \
             the authorization response will be received automatically.\n\
             If using this system remotely, you may wish to forward the port to this host \
             by creating a new SSH session with the following options: \
             '-L {port}:localhost:{port}' prior to following the link."
        ))
    }

    pub fn slot(&self) -> &Arc<CaptureSlot> {
        &self.slot
    }

    /// Stop the listener and wait for it to exit.
    pub async fn stop(&mut self) -> Result<()> {
        let (_, handle) = self.listener.take().ok_or(WardenError::NoListener)?;
        handle.stop().await;
        Ok(())
    }

    /// Wait for the first valid redirect from either source.
    ///
    /// Invalid pasted lines are rejected and the wait goes on. Cancelling
    /// `abort`, or closing manual input when there is no listener, ends the
    /// attempt with [`WardenError::AuthorizationAborted`]. The listener is
    /// stopped before returning.
    pub async fn wait(
        mut self,
        mut manual: mpsc::UnboundedReceiver<String>,
        abort: &CancellationToken,
    ) -> Result<CapturedRedirect> {
        print_manual_prompt();
        let mut manual_open = true;

        let outcome = loop {
            if let Some(captured) = self.slot.get() {
                if captured.source == CaptureSource::Listener {
                    println!("<canceled>\nResponse provided by browser session.");
                }
                break Ok(captured);
            }

            tokio::select! {
                _ = abort.cancelled() => break Err(WardenError::AuthorizationAborted),
                line = manual.recv(), if manual_open => match line {
                    Some(line) => match validate_redirect(&line) {
                        Ok(url) => {
                            self.slot.offer(url, CaptureSource::Manual);
                        }
                        Err(_) => {
                            println!("Error: No authcode provided.");
                            print_manual_prompt();
                        }
                    },
                    None => {
                        manual_open = false;
                        if self.listener.is_none() {
                            break Err(WardenError::AuthorizationAborted);
                        }
                    }
                },
                _ = self.slot.notified() => {}
                _ = tokio::time::sleep(MANUAL_POLL_INTERVAL) => {}
            }
        };

        if self.listener.is_some() {
            self.stop().await?;
        }
        outcome
    }
}

fn print_manual_prompt() {
    print!("Please enter the full callback URL: ");
    let _ = std::io::stdout().flush();
}

fn redirect_router(slot: Arc<CaptureSlot>) -> Router {
    Router::new()
        .route("/", get(handle_redirect))
        .route("/{*path}", get(handle_redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(slot)
}

/// Handle GET/HEAD on any path.
async fn handle_redirect(
    State(slot): State<Arc<CaptureSlot>>,
    method: Method,
    uri: Uri,
) -> Html<String> {
    if method == Method::HEAD {
        return Html(String::new());
    }

    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let candidate = format!("http://localhost{}", path);

    let message = match validate_redirect(&candidate) {
        Ok(url) => match slot.offer(url, CaptureSource::Listener) {
            Offer::Accepted => REDIRECT_COMPLETED,
            Offer::AlreadyProvided => ALREADY_PROVIDED,
        },
        Err(_) => INVALID_REQUEST,
    };

    Html(format!(
        "<html><head><title>Authorization result</title></head><body><p>{}</p></body></html>",
        message
    ))
}
