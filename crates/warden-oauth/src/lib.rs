//! Encrypted OAuth 2.0 token vault with background refresh and local
//! distribution.
//!
//! A session is authorized once through the PKCE authorization-code flow,
//! then kept on disk encrypted under a password-protected RSA key. While
//! running, the current token is held in a shared [`TokenState`] and
//! handed to local consumers through a plaintext file and a Unix socket.
//!
//! # Components
//!
//! - [`crypto`]: password-protected keypair and AES-CTR/RSA-OAEP payload encryption
//! - [`vault`]: the session file and its password prompts
//! - [`state`]: shared token holder with change notification
//! - [`redirect`] / [`authorize`]: redirect capture and the authorization attempt
//! - [`refresher`]: refresh scheduling decisions and refresh-then-persist
//! - [`file_writer`] / [`socket`]: token distribution

pub mod authorize;
pub mod crypto;
pub mod error;
pub mod file_writer;
pub mod fsutil;
pub mod oauth;
pub mod prompt;
pub mod redirect;
pub mod refresher;
pub mod server;
#[cfg(unix)]
pub mod socket;
pub mod state;
pub mod token;
pub mod vault;

#[cfg(test)]
mod testing;

pub use authorize::AuthorizationFlow;
pub use error::{Result, WardenError};
pub use file_writer::{FileWriterDaemon, write_access_token};
pub use oauth::{HttpOAuthClient, OAuthClient, PkceChallenge};
pub use prompt::{PasswordInput, PasswordPrompt, ScriptedPrompt, TerminalPrompt};
pub use redirect::{CaptureSlot, CaptureSource, CapturedRedirect, RedirectCaptureServer};
pub use refresher::{DEFAULT_REFRESH_THRESHOLD_SECS, TokenRefresher, is_refresh_due};
#[cfg(unix)]
pub use socket::SocketTokenServer;
pub use state::TokenState;
pub use token::{ClientCredentials, Registration, Token};
pub use vault::{LoadedSession, SessionVault};
