//! Service configuration for ragam-id
//!
//! Each setting resolves ENV → TOML → default. Provider credentials have no
//! default: a missing one stops the service at startup.

use crate::services::acrcloud_client::DEFAULT_ACR_HOST;
use crate::services::raga_resolver::DEFAULT_TARGET_DOMAIN;
use crate::services::serpapi_client::DEFAULT_SERPAPI_BASE_URL;
use crate::services::{AcrCloudConfig, SerpApiConfig};
use ragam_common::config::{require_setting, resolve_parsed, resolve_setting, TomlConfig};
use ragam_common::Result;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SCRATCH_DIR: &str = "uploads";
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const ENV_ACR_ACCESS_KEY: &str = "ACR_ACCESS_KEY";
pub const ENV_ACR_ACCESS_SECRET: &str = "ACR_ACCESS_SECRET";
pub const ENV_ACR_HOST: &str = "ACR_HOST";
pub const ENV_SERPAPI_KEY: &str = "SERPAPI_KEY";
pub const ENV_SERPAPI_BASE_URL: &str = "SERPAPI_BASE_URL";
pub const ENV_TARGET_DOMAIN: &str = "RAGAM_TARGET_DOMAIN";
pub const ENV_HOST: &str = "RAGAM_HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_SCRATCH_DIR: &str = "RAGAM_SCRATCH_DIR";
pub const ENV_STATIC_DIR: &str = "RAGAM_STATIC_DIR";
pub const ENV_MAX_UPLOAD_BYTES: &str = "RAGAM_MAX_UPLOAD_BYTES";

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub scratch_dir: PathBuf,
    /// Front-end directory, only when it resolves to an existing directory
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub acr: AcrCloudConfig,
    pub serpapi: SerpApiConfig,
    pub target_domain: String,
}

impl ServiceConfig {
    pub fn resolve(toml: &TomlConfig) -> Result<Self> {
        let acr = AcrCloudConfig {
            host: resolve_setting(ENV_ACR_HOST, toml.acr_host.as_deref())
                .unwrap_or_else(|| DEFAULT_ACR_HOST.to_string()),
            access_key: require_setting(
                ENV_ACR_ACCESS_KEY,
                "acr_access_key",
                toml.acr_access_key.as_deref(),
            )?,
            access_secret: require_setting(
                ENV_ACR_ACCESS_SECRET,
                "acr_access_secret",
                toml.acr_access_secret.as_deref(),
            )?,
        };

        let serpapi = SerpApiConfig {
            base_url: resolve_setting(ENV_SERPAPI_BASE_URL, toml.serpapi_base_url.as_deref())
                .unwrap_or_else(|| DEFAULT_SERPAPI_BASE_URL.to_string()),
            api_key: require_setting(ENV_SERPAPI_KEY, "serpapi_key", toml.serpapi_key.as_deref())?,
        };

        let scratch_dir = resolve_path(ENV_SCRATCH_DIR, toml.scratch_dir.as_ref())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_DIR));

        let static_dir = resolve_path(ENV_STATIC_DIR, toml.static_dir.as_ref())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        let static_dir = if static_dir.is_dir() {
            Some(static_dir)
        } else {
            tracing::debug!(path = %static_dir.display(), "No static directory, front-end disabled");
            None
        };

        Ok(Self {
            host: resolve_setting(ENV_HOST, toml.host.as_deref())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: resolve_parsed(ENV_PORT, toml.port, DEFAULT_PORT)?,
            scratch_dir,
            static_dir,
            max_upload_bytes: resolve_parsed(
                ENV_MAX_UPLOAD_BYTES,
                toml.max_upload_bytes,
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            acr,
            serpapi,
            target_domain: resolve_setting(ENV_TARGET_DOMAIN, toml.target_domain.as_deref())
                .unwrap_or_else(|| DEFAULT_TARGET_DOMAIN.to_string()),
        })
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn resolve_path(env_var: &str, toml_value: Option<&PathBuf>) -> Option<PathBuf> {
    let toml_value = toml_value.and_then(|p| p.to_str());
    resolve_setting(env_var, toml_value).map(PathBuf::from)
}
