//! Configuration loading for the bimo CLI.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BIMO_`, producing a typed [`AppConfig`] that is threaded into every
//! component constructor. Nothing below this module reads the environment.

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default gateway base URL when neither flag, env, nor session provide one.
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8001/v1";
/// Google OAuth token endpoint used for the JWT-bearer grant.
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Cloud Billing API base.
pub const DEFAULT_CLOUD_BILLING_BASE: &str = "https://cloudbilling.googleapis.com";
/// BigQuery API base.
pub const DEFAULT_BIGQUERY_BASE: &str = "https://bigquery.googleapis.com";

/// Application configuration derived from `BIMO_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Explicit gateway override; `None` lets the session file decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_google_token_url")]
    pub google_token_url: String,
    #[serde(default = "default_cloud_billing_base")]
    pub cloud_billing_base: String,
    #[serde(default = "default_bigquery_base")]
    pub bigquery_base: String,
    /// Directory holding `config.json`; defaults to `~/.bimo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            gateway_url: None,
            http_timeout_secs: default_http_timeout_secs(),
            google_token_url: default_google_token_url(),
            cloud_billing_base: default_cloud_billing_base(),
            bigquery_base: default_bigquery_base(),
            config_dir: None,
        }
    }
}

impl AppConfig {
    /// Per-request timeout applied to every HTTP client.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Resolves the session directory, falling back to `~/.bimo`.
    pub fn session_dir(&self) -> Option<PathBuf> {
        self.config_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".bimo")))
    }

    /// Picks the gateway base URL: explicit flag, then configured override,
    /// then the URL saved at login, then the built-in default.
    pub fn resolve_gateway(&self, flag: Option<&str>, saved: Option<&str>) -> String {
        [flag, self.gateway_url.as_deref(), saved]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .unwrap_or(DEFAULT_GATEWAY_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Returns a redacted JSON representation (URL passwords are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if let Some(gateway) = config.gateway_url.as_deref()
            && let Ok(mut parsed) = Url::parse(gateway)
            && parsed.password().is_some()
            && parsed.set_password(Some("[REDACTED]")).is_ok()
        {
            config.gateway_url = Some(parsed.to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout_secs == 0 || self.http_timeout_secs > 600 {
            return Err(ConfigError::InvalidHttpTimeout {
                value: self.http_timeout_secs,
            });
        }

        let mut urls = vec![
            ("GOOGLE_TOKEN_URL", self.google_token_url.as_str()),
            ("CLOUD_BILLING_BASE", self.cloud_billing_base.as_str()),
            ("BIGQUERY_BASE", self.bigquery_base.as_str()),
        ];
        if let Some(gateway) = self.gateway_url.as_deref() {
            urls.push(("GATEWAY_URL", gateway));
        }
        for (field, value) in urls {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field,
                value: value.to_string(),
                source,
            })?;
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_google_token_url() -> String {
    DEFAULT_GOOGLE_TOKEN_URL.to_string()
}

fn default_cloud_billing_base() -> String {
    DEFAULT_CLOUD_BILLING_BASE.to_string()
}

fn default_bigquery_base() -> String {
    DEFAULT_BIGQUERY_BASE.to_string()
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid BIMO_{field} '{value}': {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("invalid BIMO_HTTP_TIMEOUT_SECS '{value}': expected an integer")]
    UnparsableHttpTimeout { value: String },
    #[error("http timeout must be between 1 and 600 seconds, got {value}")]
    InvalidHttpTimeout { value: u64 },
}

/// Loads configuration using layered `.env` files and `BIMO_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.<profile>`, `.env.<profile>.local`,
    /// then the process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("BIMO_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_non_empty(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let log_level = take_non_empty(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_non_empty(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let gateway_url = take_non_empty(&mut layered, "GATEWAY_URL");
        let http_timeout_secs = match take_non_empty(&mut layered, "HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::UnparsableHttpTimeout { value: raw })?,
            None => default_http_timeout_secs(),
        };
        let google_token_url = take_non_empty(&mut layered, "GOOGLE_TOKEN_URL")
            .unwrap_or_else(default_google_token_url);
        let cloud_billing_base = take_non_empty(&mut layered, "CLOUD_BILLING_BASE")
            .unwrap_or_else(default_cloud_billing_base);
        let bigquery_base =
            take_non_empty(&mut layered, "BIGQUERY_BASE").unwrap_or_else(default_bigquery_base);
        let config_dir = take_non_empty(&mut layered, "CONFIG_DIR").map(PathBuf::from);

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            gateway_url,
            http_timeout_secs,
            google_token_url,
            cloud_billing_base,
            bigquery_base,
            config_dir,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("BIMO_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("BIMO_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_non_empty(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
