//! Configuration for drivewiki.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (WIKI_BASE_URL, WIKI_USER, WIKI_PASS,
//!    WIKI_SESSION_COOKIE, DRIVE_ACCESS_TOKEN, DRIVE_API_URL, DRIVEWIKI_DEV)
//! 2. Config file (.drivewiki/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .drivewiki/config.yaml
//! - Falls back to ~/.drivewiki/config.yaml
//! - `templates_dir` is relative to the directory containing .drivewiki/
//!
//! Credentials have no defaults outside development mode. Development mode
//! fills in a local wiki at http://localhost:8090 with admin/admin.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::adapters::confluence::ConfluenceSettings;
use crate::core::{MigrationLimits, RetryPolicy};

pub const ENV_WIKI_BASE_URL: &str = "WIKI_BASE_URL";
pub const ENV_WIKI_USER: &str = "WIKI_USER";
pub const ENV_WIKI_PASS: &str = "WIKI_PASS";
pub const ENV_WIKI_SESSION_COOKIE: &str = "WIKI_SESSION_COOKIE";
pub const ENV_DRIVE_ACCESS_TOKEN: &str = "DRIVE_ACCESS_TOKEN";
pub const ENV_DRIVE_API_URL: &str = "DRIVE_API_URL";
pub const ENV_DEV: &str = "DRIVEWIKI_DEV";

const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com";
const DEV_WIKI_BASE_URL: &str = "http://localhost:8090";
const DEV_WIKI_CREDENTIAL: &str = "admin";

const CONFIG_DIR: &str = ".drivewiki";
const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub wiki: WikiConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub limits: Option<MigrationLimits>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    /// Directory with embed template overrides
    pub templates_dir: Option<String>,
    #[serde(default)]
    pub attach_exports: bool,
    #[serde(default)]
    pub development: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WikiConfig {
    pub base_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub session_cookie: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveConfig {
    pub api_url: Option<String>,
    pub access_token: Option<String>,
}

/// A required setting is missing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{setting} is not set (set {env} or '{key}' in .drivewiki/config.yaml)")]
    Missing {
        setting: &'static str,
        env: &'static str,
        key: &'static str,
    },

    #[error("'{key}' is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Drive rejects larger listing pages
const MAX_DRIVE_PAGE_SIZE: u32 = 1000;

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub wiki_base_url: Option<String>,
    pub wiki_user: Option<String>,
    pub wiki_password: Option<String>,
    pub wiki_session_cookie: String,
    pub drive_api_url: String,
    pub drive_access_token: Option<String>,
    pub limits: MigrationLimits,
    pub retry: RetryPolicy,
    pub templates_dir: Option<PathBuf>,
    pub attach_exports: bool,
    pub development: bool,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment and the nearest config file
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();
        let file = match config_file {
            Some(ref path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        let config = resolve(file, config_file, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject limits and retry settings no run can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: &str| {
            Err(ConfigError::Invalid {
                key,
                reason: reason.to_string(),
            })
        };

        let limits = &self.limits;
        if limits.page_size == 0 || limits.page_size > MAX_DRIVE_PAGE_SIZE {
            return invalid("limits.page_size", "must be between 1 and 1000");
        }
        if limits.request_timeout_seconds == 0 {
            return invalid("limits.request_timeout_seconds", "must be at least 1");
        }
        if limits.max_nodes == 0 {
            return invalid("limits.max_nodes", "must be at least 1");
        }
        for pattern in &limits.exclude_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::Invalid {
                    key: "limits.exclude_patterns",
                    reason: format!("'{}': {}", pattern, e),
                });
            }
        }

        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts", "must be at least 1");
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return invalid("retry.backoff_multiplier", "must be 1.0 or more");
        }

        Ok(())
    }

    /// Wiki connection settings, failing if credentials are missing
    pub fn wiki_settings(&self) -> Result<ConfluenceSettings, ConfigError> {
        let base_url = self.wiki_base_url.clone().ok_or(ConfigError::Missing {
            setting: "wiki base URL",
            env: ENV_WIKI_BASE_URL,
            key: "wiki.base_url",
        })?;
        let user = self.wiki_user.clone().ok_or(ConfigError::Missing {
            setting: "wiki user",
            env: ENV_WIKI_USER,
            key: "wiki.user",
        })?;
        let password = self.wiki_password.clone().ok_or(ConfigError::Missing {
            setting: "wiki password",
            env: ENV_WIKI_PASS,
            key: "wiki.password",
        })?;

        Ok(ConfluenceSettings {
            base_url,
            user,
            password,
            session_cookie: self.wiki_session_cookie.clone(),
        })
    }

    /// Drive access token, failing if missing
    pub fn drive_token(&self) -> Result<&str, ConfigError> {
        self.drive_access_token
            .as_deref()
            .ok_or(ConfigError::Missing {
                setting: "Drive access token",
                env: ENV_DRIVE_ACCESS_TOKEN,
                key: "drive.access_token",
            })
    }
}

/// Find config file by searching current directory and parents, then home
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let home_config = dirs::home_dir()?.join(CONFIG_DIR).join(CONFIG_FILE);
    home_config.exists().then_some(home_config)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Merge environment, file and defaults
fn resolve(
    file: ConfigFile,
    config_file: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Config {
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let development = non_empty(ENV_DEV)
        .map(|v| is_truthy(&v))
        .unwrap_or(file.development);

    let dev_default = |value: &str| development.then(|| value.to_string());

    let wiki_base_url = non_empty(ENV_WIKI_BASE_URL)
        .or(file.wiki.base_url)
        .or_else(|| dev_default(DEV_WIKI_BASE_URL));
    let wiki_user = non_empty(ENV_WIKI_USER)
        .or(file.wiki.user)
        .or_else(|| dev_default(DEV_WIKI_CREDENTIAL));
    let wiki_password = non_empty(ENV_WIKI_PASS)
        .or(file.wiki.password)
        .or_else(|| dev_default(DEV_WIKI_CREDENTIAL));
    let wiki_session_cookie = non_empty(ENV_WIKI_SESSION_COOKIE)
        .or(file.wiki.session_cookie)
        .unwrap_or_default();

    let drive_api_url = non_empty(ENV_DRIVE_API_URL)
        .or(file.drive.api_url)
        .unwrap_or_else(|| DEFAULT_DRIVE_API_URL.to_string());
    let drive_access_token = non_empty(ENV_DRIVE_ACCESS_TOKEN).or(file.drive.access_token);

    // Project root is the parent of .drivewiki/
    let base_dir = config_file
        .as_deref()
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    let templates_dir = file
        .templates_dir
        .as_deref()
        .map(|dir| resolve_path(&base_dir, dir));

    Config {
        wiki_base_url,
        wiki_user,
        wiki_password,
        wiki_session_cookie,
        drive_api_url,
        drive_access_token,
        limits: file.limits.unwrap_or_default(),
        retry: file.retry.unwrap_or_default(),
        templates_dir,
        attach_exports: file.attach_exports,
        development,
        config_file,
    }
}
