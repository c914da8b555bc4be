use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

/// Storage backend used for per-group settings.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Memory,
    Sqlite,
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub default_tags: Vec<String>,
    #[serde(default)]
    pub enabled_by_default: bool,
    #[serde(default = "default_true")]
    pub use_global_tags_by_default: bool,
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_url() -> String {
    "https://derpibooru.org/api/v1/json/search/images".to_string()
}

fn default_database_url() -> String {
    "sqlite://group_configs.db?mode=rwc".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PHILOMENA_SEARCH").try_parsing(true))
            .build()?;

        s.try_deserialize()
    }

    /// The API key to attach to board requests, if one is configured.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}
