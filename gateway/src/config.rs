use notion::config::ApiConfig;
use serde::Deserialize;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Port cannot be 0")]
    InvalidPort,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    pub notion: ApiConfig,
    /// Include upstream error bodies as `details` in error responses.
    #[serde(default)]
    pub development: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listener.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}
