//! Client configuration.
//!
//! `Settings` is built once, handed to the client, and never mutated after
//! that. It can be assembled with the `with_*` builders, deserialized from a
//! config file, or read from `POSAPI_*` environment variables.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::http::Headers;

pub const DEFAULT_BASE_URL: &str = "http://localhost:7080";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_BASE_URL: &str = "POSAPI_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "POSAPI_TIMEOUT_SECS";
pub const ENV_VERIFY_TLS: &str = "POSAPI_VERIFY_TLS";

/// A `POSAPI_*` variable that is set but cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("invalid POSAPI_TIMEOUT_SECS '{value}': {reason}")]
    InvalidTimeout { value: String, reason: String },

    #[error("invalid POSAPI_VERIFY_TLS '{value}': expected true/false, yes/no, on/off or 1/0")]
    InvalidVerifyTls { value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    base_url: String,
    timeout: Duration,
    verify_tls: bool,
    default_headers: Headers,
}

/// Config-file shape; converted into `Settings` so normalization always runs.
#[derive(Deserialize)]
#[serde(default)]
struct RawSettings {
    base_url: String,
    timeout_secs: f64,
    verify_tls: bool,
    default_headers: std::collections::BTreeMap<String, String>,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
            verify_tls: true,
            default_headers: Default::default(),
        }
    }
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        let timeout = Duration::try_from_secs_f64(raw.timeout_secs).unwrap_or(DEFAULT_TIMEOUT);
        Settings::new(raw.base_url)
            .with_timeout(timeout)
            .with_verify_tls(raw.verify_tls)
            .with_default_headers(raw.default_headers.into_iter().collect())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Settings {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.as_ref()),
            timeout: DEFAULT_TIMEOUT,
            verify_tls: true,
            default_headers: Vec::new(),
        }
    }

    /// Defaults overlaid with any `POSAPI_*` variables that are set.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match lookup(ENV_BASE_URL) {
            Some(url) => Settings::new(url),
            None => Settings::default(),
        };

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let invalid = |reason: String| SettingsError::InvalidTimeout {
                value: raw.clone(),
                reason,
            };
            let secs: f64 = raw.trim().parse::<f64>().map_err(|e| invalid(e.to_string()))?;
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| invalid(e.to_string()))?;
            settings = settings.with_timeout(timeout);
        }

        if let Some(raw) = lookup(ENV_VERIFY_TLS) {
            let verify = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(SettingsError::InvalidVerifyTls { value: raw }),
            };
            settings = settings.with_verify_tls(verify);
        }

        Ok(settings)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Headers sent with every request, e.g. an API key.
    pub fn with_default_headers(mut self, headers: Headers) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
