//! Client configuration.
//!
//! Provides a `ClientConfig` struct shared by clients to locate the remote
//! todo service and tune background delivery. Values come from a JSON file
//! and may be overridden by `TODO_*` environment variables.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::remote::{HttpTodoApi, OfflineTodoApi, RemoteResult, TodoApi};
use crate::sync::DEFAULT_MAX_IN_FLIGHT;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_API_URL: &str = "TODO_API_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TODO_HTTP_TIMEOUT_SECS";
pub const ENV_MAX_IN_FLIGHT: &str = "TODO_MAX_IN_FLIGHT";
pub const ENV_SYNC_ON_START: &str = "TODO_SYNC_ON_START";

/// Remote endpoint and delivery settings.
///
/// `api_base_url = None` means offline-only: mutations are queued and never
/// delivered until an endpoint is configured.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default)]
    pub sync_on_start: bool,
}

const fn default_max_in_flight() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            request_timeout_secs: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            sync_on_start: false,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Overlay the process environment onto this config.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` (keyed by the `TODO_*` variable names).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_HTTP_TIMEOUT_SECS)) {
            self.request_timeout_secs = Some(parse_number(ENV_HTTP_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_MAX_IN_FLIGHT)) {
            self.max_in_flight = parse_number(ENV_MAX_IN_FLIGHT, &raw)?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_SYNC_ON_START)) {
            self.sync_on_start = parse_flag(ENV_SYNC_ON_START, &raw)?;
        }
        self.normalize();
        self.validate()?;
        Ok(self)
    }

    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "Failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    /// Configured endpoint, if any.
    pub fn api_base_url(&self) -> Option<String> {
        normalize_text_option(self.api_base_url.clone())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub const fn max_in_flight(&self) -> usize {
        if self.max_in_flight == 0 {
            1
        } else {
            self.max_in_flight
        }
    }

    /// Remote client for the configured endpoint, or the offline stand-in.
    pub fn remote_api(&self) -> RemoteResult<Arc<dyn TodoApi>> {
        match self.api_base_url() {
            Some(url) => Ok(Arc::new(HttpTodoApi::new(url, self.request_timeout())?)),
            None => Ok(Arc::new(OfflineTodoApi)),
        }
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.clone())
            .map(|url| url.trim_end_matches('/').to_string());
    }

    fn validate(&self) -> Result<()> {
        if let Some(url) = self.api_base_url.as_deref() {
            if !is_http_url(url) {
                return Err(Error::InvalidInput(format!(
                    "API base URL must include http:// or https://: {url}"
                )));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| {
        Error::InvalidInput(format!("{key} must be a non-negative integer, got '{raw}'"))
    })
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = ClientConfig {
            api_base_url: Some("https://file.example.com".to_string()),
            ..Default::default()
        }
        .with_overrides(lookup(&[
            (ENV_API_URL, " https://env.example.com/api/ "),
            (ENV_HTTP_TIMEOUT_SECS, "15"),
            (ENV_MAX_IN_FLIGHT, "2"),
            (ENV_SYNC_ON_START, "yes"),
        ]))
        .unwrap();

        assert_eq!(
            config,
            ClientConfig {
                api_base_url: Some("https://env.example.com/api".to_string()),
                request_timeout_secs: Some(15),
                max_in_flight: 2,
                sync_on_start: true,
            }
        );
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn overrides_reject_malformed_values() {
        let error = ClientConfig::default()
            .with_overrides(lookup(&[(ENV_MAX_IN_FLIGHT, "many")]))
            .unwrap_err();
        assert!(error.to_string().contains(ENV_MAX_IN_FLIGHT));

        let error = ClientConfig::default()
            .with_overrides(lookup(&[(ENV_API_URL, "example.com")]))
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[test]
    fn zero_bounds_are_clamped() {
        let config = ClientConfig {
            request_timeout_secs: Some(0),
            max_in_flight: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.max_in_flight(), 1);
    }

    #[test]
    fn config_file_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("todo").join("config.json");
        assert_eq!(
            ClientConfig::load_from_path(&path).unwrap(),
            ClientConfig::default()
        );

        let config = ClientConfig {
            api_base_url: Some("http://localhost:8080/api/".to_string()),
            sync_on_start: true,
            ..Default::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.api_base_url.as_deref(),
            Some("http://localhost:8080/api")
        );
        assert!(loaded.sync_on_start);
    }

    #[test]
    fn config_file_rejects_unknown_fields() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url": null, "surprise": 1}"#).unwrap();

        let error = ClientConfig::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn missing_endpoint_selects_offline_api() {
        assert!(ClientConfig::default().remote_api().is_ok());
        let configured = ClientConfig {
            api_base_url: Some("http://localhost:8080".to_string()),
            ..Default::default()
        };
        assert!(configured.remote_api().is_ok());
    }
}
