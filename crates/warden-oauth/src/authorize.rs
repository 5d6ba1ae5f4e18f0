//! One interactive authorization-code attempt.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WardenError};
use crate::oauth::{OAuthClient, PkceChallenge, build_authorization_url, generate_state};
use crate::redirect::RedirectCaptureServer;
use crate::token::{ClientCredentials, Registration, Token};

/// An authorization attempt in progress.
///
/// [`begin`](Self::begin) sets up the redirect capture and the URL the user
/// has to visit; [`complete`](Self::complete) waits for the redirect and
/// exchanges its code. The PKCE verifier never leaves this value.
#[derive(Debug)]
pub struct AuthorizationFlow {
    registration: Registration,
    client: ClientCredentials,
    server: RedirectCaptureServer,
    redirect_uri: String,
    pkce: PkceChallenge,
    state: String,
    authorization_url: String,
}

impl AuthorizationFlow {
    /// Start an attempt.
    ///
    /// Loopback registrations get a listener on `port` (0 for any) and the
    /// redirect URI is pointed at it. Anything else is manual entry only.
    pub async fn begin(
        registration: Registration,
        client: ClientCredentials,
        port: u16,
    ) -> Result<Self> {
        let server = if registration.is_loopback_redirect() {
            RedirectCaptureServer::bind(port).await?
        } else {
            tracing::info!(
                redirect_uri = %registration.redirect_uri,
                "Redirect URI is not local, using manual entry only"
            );
            RedirectCaptureServer::manual_only()
        };

        let redirect_uri = server
            .redirect_uri()
            .unwrap_or_else(|| registration.redirect_uri.clone());
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let authorization_url =
            build_authorization_url(&registration, &client, &redirect_uri, &pkce.challenge, &state);

        Ok(Self {
            registration,
            client,
            server,
            redirect_uri,
            pkce,
            state,
            authorization_url,
        })
    }

    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn listener_port(&self) -> Result<u16> {
        self.server.port()
    }

    /// What to tell the user before waiting.
    pub fn instructions(&self) -> String {
        let mut text = format!("Please go to {} and authorize access.", self.authorization_url);
        if let Some(listener) = self.server.instructions() {
            text.push('\n');
            text.push_str(&listener);
        }
        text
    }

    /// Wait for the redirect, check it belongs to this attempt and trade
    /// the code for a token.
    pub async fn complete(
        self,
        oauth: &dyn OAuthClient,
        manual: mpsc::UnboundedReceiver<String>,
        abort: &CancellationToken,
    ) -> Result<Token> {
        let captured = self.server.wait(manual, abort).await?;

        if let Some(returned) = captured.state()
            && returned != self.state
        {
            return Err(WardenError::StateMismatch);
        }
        let code = captured
            .code()
            .ok_or_else(|| WardenError::InvalidRedirect("No authcode provided.".to_string()))?;

        tracing::debug!(source = ?captured.source, "Exchanging authorization code");
        oauth
            .exchange_code(
                &self.registration,
                &self.client,
                &self.redirect_uri,
                &code,
                &self.pkce.verifier,
            )
            .await
    }
}
