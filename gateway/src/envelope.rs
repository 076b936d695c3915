//! JSON envelope shared by every response: `{"error": false, "data": ...}`
//! on success, `{"error": true, "message": ..., "details"?: ...}` on failure.

use axum::Json;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    HeaderName,
};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
    ]
}

#[derive(Serialize)]
struct SuccessBody<T> {
    error: bool,
    data: T,
}

#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            status: StatusCode::OK,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Json(SuccessBody {
            error: false,
            data: self.data,
        });
        (self.status, cors_headers(), body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: true,
            message: self.message,
            details: self.details,
        });
        (self.status, cors_headers(), body).into_response()
    }
}

/// Answer to a CORS preflight: no content, only the CORS headers.
pub async fn preflight() -> Response {
    (StatusCode::NO_CONTENT, cors_headers()).into_response()
}
