//! Error types for the token vault.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Errors that can occur while managing the token lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// No token is held, or the held token has no access token.
    #[error("No token available: {0}")]
    NoToken(String),

    /// The held token carries no expiry.
    #[error("Token is missing its expiry")]
    MissingExpiry,

    /// Encryption was attempted before a keypair exists.
    #[error("No public key available")]
    NoPublicKey,

    /// The private key cannot be created or unlocked (input canceled).
    #[error("No private key: {0}")]
    NoPrivateKey(String),

    /// The supplied password does not unlock the private key.
    #[error("Bad password: {0}")]
    BadPassword(String),

    /// Stored or transported data could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A cryptographic primitive failed.
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// The user canceled the authorization capture.
    #[error("Authorization aborted")]
    AuthorizationAborted,

    /// A candidate redirect URL does not carry an authorization code.
    #[error("Invalid redirect: {0}")]
    InvalidRedirect(String),

    /// The redirect's `state` does not match the one we sent.
    #[error("State mismatch in authorization redirect")]
    StateMismatch,

    /// No listener is running.
    #[error("No listener running")]
    NoListener,

    /// A listener is already running.
    #[error("Server already running")]
    AlreadyRunning,

    /// The session could not be persisted.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Filesystem or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// The authorization server returned an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for WardenError {
    fn from(e: reqwest::Error) -> Self {
        WardenError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for WardenError {
    fn from(e: serde_json::Error) -> Self {
        WardenError::Serialization(e.to_string())
    }
}
