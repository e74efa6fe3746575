//! Configuration file discovery and layered setting resolution
//!
//! Every setting resolves with the same priority:
//! 1. Environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default, or a startup error for required credentials

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "RAGAM_CONFIG";

/// Contents of `config.toml`. Every field is optional; absent keys fall
/// through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scratch_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
    pub acr_host: Option<String>,
    pub acr_access_key: Option<String>,
    pub acr_access_secret: Option<String>,
    pub serpapi_key: Option<String>,
    pub serpapi_base_url: Option<String>,
    pub target_domain: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[logging]` table
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Locate the config file.
///
/// `RAGAM_CONFIG` wins when set (the file is then required to exist);
/// otherwise `<config_dir>/ragam/config.toml` is used if present.
pub fn config_file_path() -> Result<Option<PathBuf>> {
    if let Some(explicit) = non_blank_env(CONFIG_PATH_ENV) {
        let path = PathBuf::from(explicit);
        if !path.exists() {
            return Err(Error::Config(format!(
                "{} points to a missing file: {}",
                CONFIG_PATH_ENV,
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    Ok(dirs::config_dir()
        .map(|d| d.join("ragam").join("config.toml"))
        .filter(|p| p.exists()))
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the discovered config file, or defaults when there is none
pub fn load_default_toml_config() -> Result<TomlConfig> {
    match config_file_path()? {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config file");
            load_toml_config(&path)
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Validate a setting value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn non_blank_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_value(v))
}

/// Resolve a string setting: ENV → TOML. Blank values count as absent.
pub fn resolve_setting(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    non_blank_env(env_var).or_else(|| {
        toml_value
            .filter(|v| is_valid_value(v))
            .map(|v| v.to_string())
    })
}

/// Resolve a setting that has no default. Absence is a startup error.
pub fn require_setting(env_var: &str, toml_key: &str, toml_value: Option<&str>) -> Result<String> {
    resolve_setting(env_var, toml_value).ok_or_else(|| {
        Error::Config(format!(
            "{} not configured. Set the {} environment variable or `{}` in config.toml",
            toml_key, env_var, toml_key
        ))
    })
}

/// Resolve and parse a setting: ENV (parsed) → TOML → default.
pub fn resolve_parsed<T>(env_var: &str, toml_value: Option<T>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank_env(env_var) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            Error::Config(format!("{}='{}' is invalid: {}", env_var, raw, e))
        }),
        None => Ok(toml_value.unwrap_or(default)),
    }
}
