//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Missing required section or field.
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// No usable location for a default path.
    #[error("cannot determine default {0}; set it explicitly")]
    NoDefaultPath(String),
}
