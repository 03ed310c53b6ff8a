use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::RefreshSettings;

pub const DEFAULT_BASE_URL: &str = "https://127.0.0.1:8080/api/v1";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_UNAUTHENTICATED_STATUS: u16 = 401;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_unauthenticated_status")]
    pub unauthenticated_status: u16,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// How long a caller parked behind an in-flight refresh may wait.
    /// `None` waits for the refresh however long it takes.
    #[serde(default)]
    pub refresh_wait_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub allow_insecure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            refresh_path: default_refresh_path(),
            unauthenticated_status: default_unauthenticated_status(),
            request_timeout_seconds: default_request_timeout_seconds(),
            refresh_wait_timeout_seconds: None,
            allow_insecure: false,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn refresh_settings(&self) -> RefreshSettings {
        RefreshSettings {
            refresh_path: self.refresh_path.clone(),
            wait_timeout: self.refresh_wait_timeout_seconds.map(Duration::from_secs),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_unauthenticated_status() -> u16 {
    DEFAULT_UNAUTHENTICATED_STATUS
}

fn default_request_timeout_seconds() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

/// Reads a YAML or JSON config file. A missing or unreadable file yields
/// the defaults.
pub fn load_config(path: impl AsRef<Path>) -> ClientConfig {
    let path = path.as_ref();
    if !path.exists() {
        warn!(event = "config_missing", path = %path.display());
        return ClientConfig::default();
    }
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!(event = "config_read_failed", path = %path.display(), error = %err);
            return ClientConfig::default();
        }
    };
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed: Result<ClientConfig, String> = if is_json {
        serde_json::from_str(&contents).map_err(|err| err.to_string())
    } else {
        serde_yaml::from_str(&contents).map_err(|err| err.to_string())
    };
    match parsed {
        Ok(mut config) => {
            if config.refresh_wait_timeout_seconds == Some(0) {
                warn!(event = "config_invalid", field = "refresh_wait_timeout_seconds", value = 0);
                config.refresh_wait_timeout_seconds = None;
            }
            config
        }
        Err(err) => {
            warn!(event = "config_parse_failed", path = %path.display(), error = %err);
            ClientConfig::default()
        }
    }
}

pub fn apply_env_overrides(config: &mut ClientConfig) {
    apply_overrides(config, |key| env::var(key).ok());
}

pub fn apply_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(value) = lookup("RENEW_BASE_URL") {
        config.base_url = value;
    }
    if let Some(value) = lookup("RENEW_REFRESH_PATH") {
        config.refresh_path = value;
    }
    if let Some(value) = lookup("RENEW_UNAUTHENTICATED_STATUS") {
        match value.trim().parse::<u16>() {
            Ok(status) if (100..600).contains(&status) => config.unauthenticated_status = status,
            _ => warn!(event = "config_invalid", field = "RENEW_UNAUTHENTICATED_STATUS", value = %value),
        }
    }
    if let Some(value) = lookup("RENEW_REQUEST_TIMEOUT_SECONDS") {
        match value.trim().parse::<u64>() {
            Ok(seconds) if seconds > 0 => config.request_timeout_seconds = seconds,
            _ => warn!(event = "config_invalid", field = "RENEW_REQUEST_TIMEOUT_SECONDS", value = %value),
        }
    }
    if let Some(value) = lookup("RENEW_REFRESH_WAIT_TIMEOUT_SECONDS") {
        match value.trim() {
            "" | "none" | "off" => config.refresh_wait_timeout_seconds = None,
            raw => match raw.parse::<u64>() {
                Ok(seconds) if seconds > 0 => {
                    config.refresh_wait_timeout_seconds = Some(seconds)
                }
                _ => warn!(
                    event = "config_invalid",
                    field = "RENEW_REFRESH_WAIT_TIMEOUT_SECONDS",
                    value = %value
                ),
            },
        }
    }
    if let Some(value) = lookup("RENEW_ALLOW_INSECURE") {
        if let Some(enabled) = parse_bool(&value) {
            config.allow_insecure = enabled;
        } else {
            warn!(event = "config_invalid", field = "RENEW_ALLOW_INSECURE", value = %value);
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
