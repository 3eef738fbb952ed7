//! Application configuration

mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, ConfigError, GenerationConfig, LicenseConfig, LogFormat,
    LoggingConfig, RetentionPolicy, ServerConfig,
};
