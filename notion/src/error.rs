use crate::secrets::SecretError;
use reqwest::StatusCode;
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum NotionError {
    /// The API answered with a non-success status.
    #[error("{message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
        body: Option<Value>,
    },
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode response: {0}")]
    Decode(reqwest::Error),
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("pagination did not finish after {0} pages")]
    PaginationLimit(usize),
    #[error("response reported more results but no next_cursor")]
    MissingCursor,
    #[error("could not obtain API token: {0}")]
    Secret(#[from] SecretError),
}

impl NotionError {
    /// Build an `Api` error from a failed response's status and JSON body,
    /// falling back to the status text when the body has no message.
    pub fn from_response(status: StatusCode, body: Option<Value>) -> Self {
        let field = |name: &str| {
            body.as_ref()
                .and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .map(String::from)
        };

        NotionError::Api {
            status,
            code: field("code").unwrap_or_else(|| "http_error".into()),
            message: field("message").unwrap_or_else(|| format!("HTTP error {status}")),
            body,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            NotionError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
