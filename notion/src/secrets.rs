//! Secret retrieval with per-process memoization.

use crate::config::SecretSource;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::OnceCell;

#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("environment variable {0} not set")]
    MissingEnv(String),
    #[error("could not read secret file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid secret format: {0}")]
    InvalidFormat(#[from] serde_json::Error),
    #[error("{0} not found in secret")]
    MissingKey(String),
    #[error("secret is empty")]
    Empty,
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, SecretError>;
}

impl SecretSource {
    pub async fn resolve(&self) -> Result<String, SecretError> {
        let secret = match self {
            SecretSource::Env { var } => {
                std::env::var(var).map_err(|_| SecretError::MissingEnv(var.clone()))?
            }
            SecretSource::File { path, key } => {
                let contents =
                    tokio::fs::read_to_string(path)
                        .await
                        .map_err(|source| SecretError::Io {
                            path: path.clone(),
                            source,
                        })?;

                match key {
                    Some(key) => {
                        let data: Value = serde_json::from_str(&contents)?;
                        data.get(key)
                            .and_then(Value::as_str)
                            .map(String::from)
                            .ok_or_else(|| SecretError::MissingKey(key.clone()))?
                    }
                    None => contents.trim().to_string(),
                }
            }
        };

        if secret.is_empty() {
            return Err(SecretError::Empty);
        }
        Ok(secret)
    }
}

/// Resolves its source on first use and reuses the value for the rest of
/// the process. Failed lookups are not cached.
pub struct CachedToken {
    source: SecretSource,
    cell: OnceCell<String>,
}

impl CachedToken {
    pub fn new(source: SecretSource) -> Self {
        CachedToken {
            source,
            cell: OnceCell::new(),
        }
    }
}

#[async_trait]
impl TokenSource for CachedToken {
    async fn token(&self) -> Result<String, SecretError> {
        self.cell
            .get_or_try_init(|| self.source.resolve())
            .await
            .cloned()
    }
}

/// A fixed token, for callers that already hold the secret.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, SecretError> {
        Ok(self.0.clone())
    }
}
