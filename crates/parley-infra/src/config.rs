//! Configuration loader for Parley.
//!
//! Reads a TOML file (`parley.toml` by default) into [`ParleyConfig`]. Falls
//! back to defaults when the file is missing or malformed.

use std::path::Path;

use parley_types::config::ParleyConfig;
use parley_types::error::ConfigError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "parley.toml";

/// Parse config file contents.
pub fn parse_config(content: &str) -> Result<ParleyConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read and parse the config file at `path`.
pub async fn read_config(path: &Path) -> Result<ParleyConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Io(e.to_string()))?;
    parse_config(&content)
}

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`ParleyConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   returns the default.
pub async fn load_config(path: &Path) -> ParleyConfig {
    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return ParleyConfig::default();
        }
        Err(err) => {
            tracing::warn!("Cannot access {}: {err}, using defaults", path.display());
            return ParleyConfig::default();
        }
    }

    match read_config(path).await {
        Ok(config) => {
            tracing::debug!("Loaded config from {}", path.display());
            config
        }
        Err(err) => {
            tracing::warn!("{err} ({}), using defaults", path.display());
            ParleyConfig::default()
        }
    }
}
