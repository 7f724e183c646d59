//! Ambient process configuration: logging level, default state directory
//! override, and the defaults a fresh [`crate::job::JobOptions`] falls back
//! to when neither the CLI nor a resumed progress record supplies a value.
//!
//! Distinct from [`crate::job::ProgressRecord`]: this is process-wide and
//! optional (a TOML file on disk), while the progress record is per-job and
//! authoritative once a job has started.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_url")]
    pub url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_temp_increment")]
    pub temp_increment: f32,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default)]
    pub keep_alive: bool,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            delay_ms: default_delay_ms(),
            max_attempts: default_max_attempts(),
            temp_increment: default_temp_increment(),
            timeout_minutes: default_timeout_minutes(),
            keep_alive: false,
            state_dir: None,
            log_level: default_log_level(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:8080/v1/chat/completions".to_string()
}
fn default_delay_ms() -> u64 {
    60_000
}
fn default_max_attempts() -> u32 {
    7
}
fn default_temp_increment() -> f32 {
    0.15
}
fn default_timeout_minutes() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load from an explicit path, else `./llmloom.toml`, else the platform
    /// config directory, else defaults. Environment variables always win.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config from {p}"))?;
                toml::from_str(&content).context("failed to parse config")?
            }
            None => {
                let platform_path = dirs::config_dir().map(|dir| dir.join("llmloom").join("llmloom.toml"));
                let found = std::fs::read_to_string("llmloom.toml")
                    .ok()
                    .or_else(|| platform_path.and_then(|p| std::fs::read_to_string(p).ok()));
                match found {
                    Some(content) => toml::from_str(&content).context("failed to parse config")?,
                    None => Self::default(),
                }
            }
        };

        if let Ok(url) = std::env::var("LLMLOOM_URL") {
            config.url = url;
        }
        if let Ok(key) = std::env::var("LLMLOOM_API_KEY") {
            config.api_key = Some(key);
        } else if config.api_key.is_some() {
            warn!("API key found in config file; consider LLMLOOM_API_KEY instead");
        }
        if let Ok(v) = std::env::var("LLMLOOM_DELAY_MS") {
            if let Ok(n) = v.parse() {
                config.delay_ms = n;
            }
        }
        if let Ok(v) = std::env::var("LLMLOOM_LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }
}

/// Redact an API key for safe display: first 4 and last 4 characters only.
pub fn redact_api_key(key: &str) -> String {
    if key.len() <= 8 {
        "****".to_string()
    } else {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted_key = match &self.api_key {
            Some(key) => redact_api_key(key),
            None => "<not set>".to_string(),
        };
        write!(
            f,
            "Config {{ url: {}, api_key: {}, max_attempts: {}, delay_ms: {} }}",
            self.url, redacted_key, self.max_attempts, self.delay_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.delay_ms, 60_000);
        assert_eq!(config.max_attempts, 7);
        assert!((config.temp_increment - 0.15).abs() < f32::EPSILON);
    }

    #[test]
    fn api_key_redacted_in_display() {
        let config = Config { api_key: Some("sk-1234567890abcdef".to_string()), ..Config::default() };
        let shown = format!("{config}");
        assert!(!shown.contains("sk-1234567890abcdef"));
        assert!(shown.contains("sk-1...cdef"));
    }

    #[test]
    fn short_key_fully_redacted() {
        assert_eq!(redact_api_key("short"), "****");
    }

    #[test]
    fn partial_toml_uses_defaults_for_missing_fields() {
        let toml_str = r#"url = "http://custom:1234/v1/chat/completions""#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.url, "http://custom:1234/v1/chat/completions");
        assert_eq!(config.max_attempts, 7);
    }
}
