/*!
common/src/lib.rs

Shared configuration types for the newsbot client.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with layered defaults/overrides
- Accessors that resolve the effective values used by the HTTP transport and the CLI
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URL used when neither the config files nor the environment provide one.
pub const DEFAULT_BASE_URL: &str = "https://localhost:8443";
/// Transport timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;
/// Delay before redirecting to the login page after a 401.
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 100;
/// Default location of the persisted session file.
pub const DEFAULT_SESSION_PATH: &str = "data/session.json";
/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "NEWSBOT_API_URL";

/// Remote API section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto (e.g. "https://news.example.org")
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Where the CLI keeps the bearer token and user record between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: Option<String>,
}

/// Page sizes requested by the list loaders
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub news_page_size: Option<u32>,
    pub sources_page_size: Option<u32>,
    pub users_page_size: Option<u32>,
}

/// Session lifecycle tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Milliseconds to wait before the post-401 redirect fires
    pub redirect_delay_ms: Option<u64>,
}

/// Top-level client configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so an empty invocation yields the built-in defaults.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply environment overrides on top of the file configuration.
    pub fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = Some(url.trim().to_string());
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations the transport cannot work with.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url();
        let parsed = url::Url::parse(base).with_context(|| format!("Invalid api.base_url: {}", base))?;
        if parsed.cannot_be_a_base() {
            anyhow::bail!("api.base_url must be an absolute http(s) URL: {}", base);
        }
        if self.api.timeout_seconds == Some(0) {
            anyhow::bail!("api.timeout_seconds must be greater than zero");
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.session.redirect_delay_ms.unwrap_or(DEFAULT_REDIRECT_DELAY_MS))
    }

    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(self.storage.path.as_deref().unwrap_or(DEFAULT_SESSION_PATH))
    }

    pub fn news_page_size(&self) -> u32 {
        self.pagination.news_page_size.unwrap_or(20)
    }

    pub fn sources_page_size(&self) -> u32 {
        self.pagination.sources_page_size.unwrap_or(100)
    }

    pub fn users_page_size(&self) -> u32 {
        self.pagination.users_page_size.unwrap_or(20)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_config() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(15));
        assert_eq!(cfg.redirect_delay(), Duration::from_millis(100));
        assert_eq!(cfg.news_page_size(), 20);
        assert_eq!(cfg.sources_page_size(), 100);
        assert_eq!(cfg.session_path(), PathBuf::from("data/session.json"));
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cfg: Config = toml::from_str(
            r#"
            [api]
            base_url = "not a url"
            "#,
        )
        .expect("parse config");
        assert!(cfg.validate().is_err());
    }

    #[tokio::test]
    async fn override_file_wins_per_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        tokio::fs::write(
            &default_path,
            r#"
            [api]
            base_url = "https://news.example.org"
            timeout_seconds = 30

            [pagination]
            news_page_size = 50
            "#,
        )
        .await
        .expect("write default");
        tokio::fs::write(
            &override_path,
            r#"
            [api]
            timeout_seconds = 5
            "#,
        )
        .await
        .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert_eq!(cfg.base_url(), "https://news.example.org");
        assert_eq!(cfg.timeout(), Duration::from_secs(5));
        assert_eq!(cfg.news_page_size(), 50);
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load config");
        assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
    }
}
