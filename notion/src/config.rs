use crate::DEFAULT_API_VERSION;
use serde::Deserialize;
use std::path::PathBuf;

/// Where a secret value is read from.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum SecretSource {
    /// An environment variable holding the secret itself.
    Env { var: String },
    /// A file holding either the bare secret or, when `key` is set, a JSON
    /// object with the secret under that key.
    File { path: PathBuf, key: Option<String> },
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub token: SecretSource,
}

impl ApiConfig {
    pub fn new(token: SecretSource) -> Self {
        ApiConfig {
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            token,
        }
    }
}

fn default_base_url() -> String {
    "https://api.notion.com/v1".into()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "NotionLawDataCollector/1.0".into()
}
