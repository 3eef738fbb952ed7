use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::license::{parse_categories, CategoryError, LicenseCategory};
use crate::infrastructure::observability::ObservabilityConfig;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error("Invalid value for {name}: {message}")]
    InvalidEnv { name: String, message: String },

    #[error("Invalid license categories: {0}")]
    Categories(#[from] CategoryError),

    #[error("Replenish interval must be greater than zero")]
    ZeroInterval,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub licenses: LicenseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the static front-end
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// What a replenishment pass does with records that are no longer consumable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Drop every used or expired record
    ///
    /// A redeemed key disappears on the next pass, so `/api/remaining/{key}`
    /// only answers until then. Use `keep_active` to keep that lookup working.
    #[default]
    Purge,
    /// Keep used records until their window elapses, so remaining-time
    /// lookups and the report's `used` status survive replenishment
    KeepActive,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    pub store_path: PathBuf,
    /// Comma-separated `minutes` or `name=minutes` entries
    pub categories: String,
    pub min_per_category: usize,
    pub replenish_interval_secs: u64,
    pub retention: RetentionPolicy,
    /// Draw key letters from an alphabet that includes accented capitals
    pub accented_keys: bool,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared admin passphrase; empty refuses every admin request
    pub password: String,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("licenses.json"),
            categories: "10,25,60,120".to_string(),
            min_per_category: 5,
            replenish_interval_secs: 30,
            retention: RetentionPolicy::default(),
            accented_keys: false,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            system_prompt: "You are an assistant that writes stories, poems, lessons, \
                            proverbs and Bible verses."
                .to_string(),
            temperature: None,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("password", &redacted(!self.password.is_empty()))
            .finish()
    }
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &redacted(self.api_key.is_some()))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn redacted(set: bool) -> &'static str {
    if set { "[REDACTED]" } else { "<unset>" }
}

impl LicenseConfig {
    /// Parsed category list
    pub fn categories(&self) -> Result<Vec<LicenseCategory>, CategoryError> {
        parse_categories(&self.categories)
    }

    pub fn replenish_interval(&self) -> Duration {
        Duration::from_secs(self.replenish_interval_secs)
    }
}

impl GenerationConfig {
    /// Configured credential, ignoring blank values
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local`, `APP__*` variables and the
    /// flat variables of older deployments, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: Self = config.try_deserialize()?;
        app_config.apply_legacy_env(|name| std::env::var(name).ok())?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Apply `PORT`, `OPENAI_API_KEY`, `LICENSE_FILE`, `CATEGORIES`,
    /// `MIN_LICENSES` and `ADMIN_PASSWORD` on top of the layered sources
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }

        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.generation.api_key = Some(key);
        }

        if let Some(path) = lookup("LICENSE_FILE") {
            self.licenses.store_path = PathBuf::from(path);
        }

        if let Some(categories) = lookup("CATEGORIES") {
            self.licenses.categories = categories;
        }

        if let Some(min) = lookup("MIN_LICENSES") {
            self.licenses.min_per_category = parse_env("MIN_LICENSES", &min)?;
        }

        if let Some(password) = lookup("ADMIN_PASSWORD") {
            self.admin.password = password;
        }

        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.licenses.categories()?;

        if self.licenses.replenish_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        Ok(())
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            name: name.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 10000);
        assert_eq!(config.licenses.min_per_category, 5);
        assert_eq!(config.licenses.replenish_interval(), Duration::from_secs(30));
        assert_eq!(config.licenses.retention, RetentionPolicy::Purge);
        assert_eq!(config.licenses.store_path, PathBuf::from("licenses.json"));
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert!(config.generation.api_key().is_none());
        assert!(config.admin.password.is_empty());

        let categories = config.licenses.categories().unwrap();
        let minutes: Vec<u32> = categories.iter().map(|c| c.duration_minutes()).collect();
        assert_eq!(minutes, vec![10, 25, 60, 120]);

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_env_overrides() {
        let mut config = AppConfig::default();

        config
            .apply_legacy_env(env(&[
                ("PORT", "8081"),
                ("OPENAI_API_KEY", "sk-test"),
                ("LICENSE_FILE", "/tmp/keys.json"),
                ("CATEGORIES", "5,15"),
                ("MIN_LICENSES", "3"),
                ("ADMIN_PASSWORD", "hunter2"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.generation.api_key(), Some("sk-test"));
        assert_eq!(config.licenses.store_path, PathBuf::from("/tmp/keys.json"));
        assert_eq!(config.licenses.categories().unwrap().len(), 2);
        assert_eq!(config.licenses.min_per_category, 3);
        assert_eq!(config.admin.password, "hunter2");
    }

    #[test]
    fn test_legacy_env_invalid_number() {
        let mut config = AppConfig::default();
        let result = config.apply_legacy_env(env(&[("MIN_LICENSES", "many")]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { ref name, .. }) if name == "MIN_LICENSES"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_categories() {
        let mut config = AppConfig::default();
        config.licenses.categories = "10,ten".to_string();

        assert!(matches!(config.validate(), Err(ConfigError::Categories(_))));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = AppConfig::default();
        config.licenses.replenish_interval_secs = 0;

        assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let mut config = GenerationConfig::default();
        config.api_key = Some("  ".to_string());

        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let admin = AdminConfig {
            password: "hunter2".to_string(),
        };
        let mut generation = GenerationConfig::default();
        generation.api_key = Some("sk-secret".to_string());

        assert!(!format!("{:?}", admin).contains("hunter2"));
        assert!(!format!("{:?}", generation).contains("sk-secret"));
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "licenses": { "min_per_category": 2, "retention": "keep_active" },
            "logging": { "format": "json" }
        }))
        .unwrap();

        assert_eq!(config.licenses.min_per_category, 2);
        assert_eq!(config.licenses.retention, RetentionPolicy::KeepActive);
        assert_eq!(config.licenses.categories, "10,25,60,120");
        assert!(matches!(config.logging.format, LogFormat::Json));
        assert_eq!(config.logging.level, "info");
    }
}
