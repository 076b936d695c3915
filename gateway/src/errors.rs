use axum::http::{Method, StatusCode};
use notion::{NotionError, ValidationError};
use serde_json::Value;

/// The request handlers, used to pick operation-specific error wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    TestConnection,
    CreatePage,
    QueryDatabase,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::TestConnection => "test_connection",
            Operation::CreatePage => "create_page",
            Operation::QueryDatabase => "query_database",
        }
    }

    // Connection tests report upstream 400s through the generic branch.
    fn bad_request_prefix(&self) -> Option<&'static str> {
        match self {
            Operation::TestConnection => None,
            Operation::CreatePage => Some("Invalid request data: "),
            Operation::QueryDatabase => Some("Invalid query parameters: "),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("Invalid Notion API token or insufficient permissions")]
    UpstreamAuth { details: Option<Value> },

    #[error("Database not found or integration lacks access")]
    UpstreamNotFound { details: Option<Value> },

    #[error("{prefix}{message}")]
    UpstreamBadRequest {
        prefix: &'static str,
        message: String,
        details: Option<Value>,
    },

    #[error("Rate limit exceeded. Please try again later.")]
    UpstreamRateLimited { details: Option<Value> },

    #[error("Notion API error: {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Option<Value>,
    },

    #[error("Notion API error: {0}")]
    Transport(String),

    #[error("Internal server error")]
    Internal(String),
}

impl GatewayError {
    /// Classify a client error by upstream status. This is the only place
    /// upstream failures are turned into caller-facing errors.
    pub fn from_notion(err: NotionError, operation: Operation) -> Self {
        match err {
            NotionError::Api {
                status,
                message,
                body,
                ..
            } => {
                let details = body;
                match status {
                    StatusCode::UNAUTHORIZED => GatewayError::UpstreamAuth { details },
                    StatusCode::NOT_FOUND => GatewayError::UpstreamNotFound { details },
                    StatusCode::TOO_MANY_REQUESTS => GatewayError::UpstreamRateLimited { details },
                    StatusCode::BAD_REQUEST => match operation.bad_request_prefix() {
                        Some(prefix) => GatewayError::UpstreamBadRequest {
                            prefix,
                            message,
                            details,
                        },
                        None => GatewayError::Upstream {
                            status,
                            message,
                            details,
                        },
                    },
                    _ => GatewayError::Upstream {
                        status,
                        message,
                        details,
                    },
                }
            }
            err @ NotionError::Transport(_) => GatewayError::Transport(err.to_string()),
            other => GatewayError::Internal(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::UpstreamAuth { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::UpstreamNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::UpstreamBadRequest { .. } => StatusCode::BAD_REQUEST,
            GatewayError::UpstreamRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream { status, .. } => *status,
            GatewayError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Upstream error body, if any.
    pub fn details(&self) -> Option<&Value> {
        match self {
            GatewayError::UpstreamAuth { details }
            | GatewayError::UpstreamNotFound { details }
            | GatewayError::UpstreamRateLimited { details }
            | GatewayError::UpstreamBadRequest { details, .. }
            | GatewayError::Upstream { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_error(status: StatusCode) -> NotionError {
        NotionError::from_response(
            status,
            Some(json!({"code": "some_code", "message": "upstream says no"})),
        )
    }

    #[test]
    fn test_status_classes() {
        let cases = [
            (StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED, "Invalid Notion API token or insufficient permissions"),
            (StatusCode::NOT_FOUND, StatusCode::NOT_FOUND, "Database not found or integration lacks access"),
            (StatusCode::TOO_MANY_REQUESTS, StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded. Please try again later."),
            (StatusCode::BAD_REQUEST, StatusCode::BAD_REQUEST, "Invalid query parameters: upstream says no"),
            (StatusCode::CONFLICT, StatusCode::CONFLICT, "Notion API error: upstream says no"),
            (StatusCode::BAD_GATEWAY, StatusCode::BAD_GATEWAY, "Notion API error: upstream says no"),
        ];

        for (upstream, expected_status, expected_message) in cases {
            let err = GatewayError::from_notion(api_error(upstream), Operation::QueryDatabase);
            assert_eq!(err.status(), expected_status);
            assert_eq!(err.to_string(), expected_message);
            assert!(err.details().is_some());
        }
    }

    #[test]
    fn test_bad_request_wording_per_operation() {
        let err = GatewayError::from_notion(api_error(StatusCode::BAD_REQUEST), Operation::CreatePage);
        assert_eq!(err.to_string(), "Invalid request data: upstream says no");

        let err =
            GatewayError::from_notion(api_error(StatusCode::BAD_REQUEST), Operation::TestConnection);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Notion API error: upstream says no");
    }

    #[test]
    fn test_non_api_errors() {
        let err = GatewayError::from_notion(NotionError::MissingCursor, Operation::QueryDatabase);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
        assert!(err.details().is_none());

        let err = GatewayError::from(ValidationError::InvalidPageSize);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Page size must be an integer between 1 and 100");

        let err = GatewayError::MethodNotAllowed(Method::PUT);
        assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.to_string(), "Method PUT not allowed");
    }
}
