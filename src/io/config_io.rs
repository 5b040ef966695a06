use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Default config path, respecting XDG_CONFIG_HOME
pub fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    config_dir.join("doit").join("config.toml")
}

/// Default data directory, respecting XDG_DATA_HOME
pub fn default_data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local").join("share"));
    data_dir.join("doit")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}

/// Parse a config file. A missing file yields defaults unless `required`.
pub fn read_config_from(path: &Path, required: bool) -> Result<Config, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(toml::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(Config::default()),
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Apply `DOIT_DATA_DIR` and `DOIT_WEATHER_API_KEY` on top of the file
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(
        config,
        std::env::var("DOIT_DATA_DIR").ok(),
        std::env::var("DOIT_WEATHER_API_KEY").ok(),
    );
}

fn apply_overrides(config: &mut Config, data_dir: Option<String>, api_key: Option<String>) {
    if let Some(dir) = data_dir.filter(|d| !d.is_empty()) {
        config.storage.data_dir = Some(dir);
    }
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        config.weather.api_key = Some(key);
    }
}

/// Load configuration: explicit path (must exist) or the default location
/// (optional), then environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match explicit {
        Some(path) => read_config_from(path, true)?,
        None => read_config_from(&config_path(), false)?,
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Data directory from config, falling back to the XDG default
pub fn data_dir(config: &Config) -> PathBuf {
    config
        .storage
        .data_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_data_dir)
}
