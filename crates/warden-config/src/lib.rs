//! Configuration for the warden token vault.
//!
//! Provides TOML-based configuration with:
//! - Client registration and credentials (`[registration]`, `[client]`)
//! - Distribution targets (`[distribution]`), refresh timing (`[refresh]`)
//!   and the redirect listener port (`[redirect]`)
//! - Config file layering (user config dir + explicit `--config` file)
//! - Client secret resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    LoadedConfig, default_session_file, expand_home, load_config, load_config_file,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, resolve_client_secret};
pub use types::*;
