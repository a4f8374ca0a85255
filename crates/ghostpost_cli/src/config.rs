//! Layered settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `$HOME/.ghostpost/config.{toml,json,yaml}`
//! 3. `./config.{toml,json,yaml}`
//! 4. `GHOST_*` environment variables
//! 5. command line flags

use crate::auth;
use directories::BaseDirs;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use ghostpost_core::{normalize_api_url, PublishConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors while assembling settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source could not be parsed.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A required value is missing from every source.
    #[error("{key} is not set (use --{flag}, GHOST_{env}, or a config file)")]
    Missing {
        /// Settings key.
        key: &'static str,
        /// Command line flag.
        flag: &'static str,
        /// Environment variable suffix.
        env: &'static str,
    },

    /// The Admin API key could not be signed.
    #[error("invalid admin API key: {0}")]
    AdminKey(String),
}

/// Values given on the command line.
#[derive(Debug, Default, Serialize)]
pub struct Overrides {
    /// `--api-url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// `--admin-jwt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_jwt: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin_jwt: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            api_url: None,
            admin_jwt: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Normalized Admin API URL.
    pub api_url: String,
    /// Token sent as `Authorization: Ghost <token>`.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Settings {
    /// Loads settings from every source.
    pub fn load(overrides: Overrides) -> Result<Self, ConfigError> {
        let home = BaseDirs::new().map(|dirs| dirs.home_dir().join(".ghostpost"));
        let figment = figment(home.as_deref(), Path::new("."), &overrides);
        Self::from_figment(&figment)
    }

    fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: RawSettings = figment.extract().map_err(Box::new)?;

        let api_url = raw
            .api_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "api_url",
                flag: "api-url",
                env: "API_URL",
            })?;
        let admin_jwt = raw
            .admin_jwt
            .filter(|jwt| !jwt.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "admin_jwt",
                flag: "admin-jwt",
                env: "ADMIN_JWT",
            })?;

        let token = if auth::is_admin_key(&admin_jwt) {
            debug!("signing admin API key");
            auth::sign_admin_key(&admin_jwt, auth::now())
                .map_err(|e| ConfigError::AdminKey(e.to_string()))?
        } else {
            admin_jwt
        };

        Ok(Self {
            api_url: normalize_api_url(&api_url),
            token,
            timeout: Duration::from_secs(raw.timeout_secs),
        })
    }

    /// Engine configuration for these settings.
    pub fn publish_config(&self) -> PublishConfig {
        PublishConfig::new(&self.api_url).with_timeout(self.timeout)
    }
}

fn figment(home: Option<&Path>, cwd: &Path, overrides: &Overrides) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(RawSettings::default()));
    if let Some(home) = home {
        figment = merge_files(figment, home);
    }
    merge_files(figment, cwd)
        .merge(Env::prefixed("GHOST_"))
        .merge(Serialized::defaults(overrides))
}

fn merge_files(figment: Figment, dir: &Path) -> Figment {
    let file = |ext: &str| -> PathBuf { dir.join(format!("config.{ext}")) };
    figment
        .merge(Toml::file(file("toml")))
        .merge(Json::file(file("json")))
        .merge(Yaml::file(file("yaml")))
}
