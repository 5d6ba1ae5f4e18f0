//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/warden/config.toml` (or `$WARDEN_CONFIG_DIR/config.toml`)
//! 2. An explicit file passed with `--config`
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, WardenConfig};

/// Default config filename within the config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for directory resolution.
const APP_NAME: &str = "warden";

/// Default session filename within the data directory.
const SESSION_FILE: &str = "session.json";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "WARDEN_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: WardenConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (e.g., a plaintext client secret).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration from the user config dir, then `explicit` on top.
///
/// `config_dir` overrides both `WARDEN_CONFIG_DIR` and the platform
/// default. A missing user config is fine; a missing or broken explicit
/// file is an error.
pub fn load_config(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let mut config = WardenConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    if let Some(path) = explicit {
        config.merge(load_config_file(path)?);
        sources.push(ConfigSource {
            path: path.to_path_buf(),
            loaded: true,
        });
    }

    if config.has_plaintext_client_secret() {
        warnings.push(
            "[client] contains a plaintext client_secret. \
             Consider setting WARDEN_CLIENT_SECRET instead."
                .to_string(),
        );
    }

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<WardenConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    WardenConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The warden config directory.
///
/// Checks `WARDEN_CONFIG_DIR` first, then falls back to the platform
/// default (`~/.config/warden` on Linux).
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// `<data dir>/warden/session.json`.
pub fn default_session_file() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|d| d.join(APP_NAME).join(SESSION_FILE))
        .ok_or_else(|| ConfigError::NoDefaultPath("session file".to_string()))
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut WardenConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const USER: &str = r#"
[registration]
authorize_endpoint = "https://login.example.com/authorize"
token_endpoint = "https://login.example.com/token"
redirect_uri = "http://localhost"

[client]
client_id = "from-user"

[refresh]
threshold_secs = 600
"#;

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_no_files() {
        let dir = TempDir::new().unwrap();
        let loaded = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(loaded.config, WardenConfig::new());
        assert!(loaded.loaded_from().is_empty());
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_explicit_file_overrides_user_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), USER).unwrap();
        let explicit = dir.path().join("override.toml");
        fs::write(
            &explicit,
            r#"
[client]
client_id = "from-explicit"
client_secret = "shh"
"#,
        )
        .unwrap();

        let loaded = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(loaded.loaded_from().len(), 2);
        assert_eq!(loaded.config.client().unwrap().client_id, "from-explicit");
        assert_eq!(loaded.config.refresh().threshold_secs, 600);
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("plaintext"));
    }

    #[test]
    fn test_broken_user_config_is_a_warning() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "not valid toml {{{{").unwrap();

        let loaded = load_config(Some(dir.path()), None).unwrap();
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].starts_with("Failed to load"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(dir.path()), Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(
            expand_home(Path::new("/abs/session.json")),
            PathBuf::from("/abs/session.json")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/s.json")), home.join("s.json"));
        }
    }
}
