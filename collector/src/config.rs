use notion::ValidationError;
use notion::config::{ApiConfig, SecretSource};
use notion::validate::validate_database_id;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid database_id: {0}")]
    DatabaseId(#[from] ValidationError),
    #[error("courtlistener.max_concurrency must be at least 1")]
    ZeroConcurrency,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct CourtListenerConfig {
    #[serde(default = "default_courtlistener_url")]
    pub base_url: String,
    /// Searches are skipped entirely when no key is configured.
    #[serde(default)]
    pub api_key: Option<SecretSource>,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CourtListenerConfig {
    fn default() -> Self {
        CourtListenerConfig {
            base_url: default_courtlistener_url(),
            api_key: None,
            max_concurrency: default_max_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    pub database_id: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub notion: ApiConfig,
    #[serde(default)]
    pub courtlistener: CourtListenerConfig,
}

impl Config {
    /// Check the config and return the normalized database id.
    pub fn validate(&self) -> Result<String, ConfigError> {
        if self.courtlistener.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(validate_database_id(&self.database_id)?)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_courtlistener_url() -> String {
    "https://www.courtlistener.com/api/rest/v3".into()
}

fn default_max_concurrency() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    30
}
