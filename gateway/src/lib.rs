//! HTTP front for the document database: connection test, record creation
//! and record queries, each answering with the shared JSON envelope.

pub mod config;
mod envelope;
pub mod errors;
mod handlers;
pub mod metrics_defs;

#[cfg(test)]
mod testutils;

use crate::config::Config;
use crate::envelope::{ApiError, ApiResponse, preflight};
use crate::errors::{GatewayError, Operation};
use crate::metrics_defs::GATEWAY_REQUESTS;
use axum::Router;
use axum::routing::{get, post};
use notion::NotionClient;
use notion::client::NotionApi;
use notion::secrets::CachedToken;
use serde::Serialize;
use shared::counter;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ServeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("could not build Notion client: {0}")]
    Client(#[from] notion::NotionError),
}

/// Shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    notion: Arc<dyn NotionApi>,
    api_version: Arc<str>,
    development: bool,
}

impl AppState {
    pub fn new(notion: Arc<dyn NotionApi>, api_version: &str, development: bool) -> Self {
        AppState {
            notion,
            api_version: api_version.into(),
            development,
        }
    }

    fn finish<T: Serialize>(
        &self,
        operation: Operation,
        result: Result<ApiResponse<T>, GatewayError>,
    ) -> Result<ApiResponse<T>, ApiError> {
        match result {
            Ok(response) => {
                counter!(GATEWAY_REQUESTS, "operation" => operation.name(), "outcome" => "success")
                    .increment(1);
                Ok(response)
            }
            Err(err) => Err(self.reject(operation, err)),
        }
    }

    fn reject(&self, operation: Operation, err: GatewayError) -> ApiError {
        let status = err.status();
        counter!(GATEWAY_REQUESTS, "operation" => operation.name(), "outcome" => "error")
            .increment(1);

        if let GatewayError::Internal(cause) = &err {
            tracing::error!(operation = operation.name(), error = %cause, "Unexpected error");
        }
        tracing::error!(
            operation = operation.name(),
            status = status.as_u16(),
            message = %err,
            "Error response"
        );

        ApiError {
            status,
            message: err.to_string(),
            details: if self.development {
                err.details().cloned()
            } else {
                None
            },
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/test-connection",
            get(handlers::test_connection)
                .options(preflight)
                .fallback(handlers::test_connection_method_not_allowed),
        )
        .route(
            "/create-page",
            post(handlers::create_page)
                .options(preflight)
                .fallback(handlers::create_page_method_not_allowed),
        )
        .route(
            "/query-database",
            post(handlers::query_database)
                .options(preflight)
                .fallback(handlers::query_database_method_not_allowed),
        )
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<(), ServeError> {
    config.validate()?;

    let token = Arc::new(CachedToken::new(config.notion.token.clone()));
    let client = NotionClient::new(&config.notion, token)?;
    let state = AppState::new(Arc::new(client), &config.notion.api_version, config.development);

    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Gateway listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{DB, FakeNotion, database};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use notion::NotionClient;
    use notion::config::{ApiConfig, SecretSource};
    use notion::secrets::StaticToken;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(fake: Arc<FakeNotion>, development: bool) -> Router {
        router(AppState::new(fake, "2025-09-03", development))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_flattens_properties() {
        let fake = Arc::new(FakeNotion {
            query: serde_json::from_value(json!({
                "results": [{
                    "id": "page-1",
                    "created_time": "2025-03-01T00:00:00.000Z",
                    "last_edited_time": "2025-03-02T00:00:00.000Z",
                    "url": "https://www.notion.so/page-1",
                    "properties": {
                        "Name": {"type": "title", "title": [{"plain_text": "Roe v. Wade"}]},
                        "Status": {"type": "select", "select": {"name": "Active", "color": "green"}}
                    }
                }],
                "next_cursor": "cursor-2",
                "has_more": true
            }))
            .unwrap(),
            ..Default::default()
        });

        let (status, body) = send(
            app(fake.clone(), false),
            post(
                "/query-database",
                json!({"databaseId": DB, "page_size": 5}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], json!(false));
        let data = &body["data"];
        assert_eq!(
            data["results"][0]["properties"],
            json!({"Name": "Roe v. Wade", "Status": "Active"})
        );
        assert_eq!(data["results"][0]["url"], json!("https://www.notion.so/page-1"));
        assert_eq!(data["next_cursor"], json!("cursor-2"));
        assert_eq!(data["has_more"], json!(true));
        assert_eq!(data["total_count"], json!(1));
        assert_eq!(data["api_version"], json!("2025-09-03"));
        assert!(data.get("data_source_id").is_none());

        let queries = fake.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].page_size, Some(5));
    }

    #[tokio::test]
    async fn test_query_forwards_data_source() {
        let fake = Arc::new(FakeNotion {
            database: Some(database(json!([{"id": "ds-1", "type": "database"}]))),
            ..Default::default()
        });

        let (status, body) = send(
            app(fake.clone(), false),
            post("/query-database", json!({"databaseId": DB, "unknown_key": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["data_source_id"], json!("ds-1"));
        assert_eq!(body["data"]["results"], json!([]));
        let queries = fake.queries.lock().unwrap();
        assert_eq!(queries[0].data_source_id.as_deref(), Some("ds-1"));
    }

    #[tokio::test]
    async fn test_query_validation_errors() {
        let fake = Arc::new(FakeNotion::default());

        let cases = [
            (json!({"page_size": 5}), "Missing required field: databaseId"),
            (json!({"databaseId": "nope"}), "Invalid database ID format. Must be 32 hexadecimal characters."),
            (json!({"databaseId": DB, "page_size": 500}), "Page size must be an integer between 1 and 100"),
            (json!({"databaseId": DB, "sorts": "created_time"}), "Sorts must be a list"),
            (json!({"databaseId": DB, "filter": [1]}), "Filter must be an object"),
        ];

        for (request, message) in cases {
            let (status, body) = send(app(fake.clone(), false), post("/query-database", request)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], json!(true));
            assert_eq!(body["message"], json!(message));
        }

        // Nothing reached the upstream.
        assert!(fake.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let request = Request::builder()
            .method("POST")
            .uri("/query-database")
            .body(Body::from("invalid json"))
            .unwrap();

        let (status, body) = send(app(Arc::new(FakeNotion::default()), false), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Invalid JSON in request body"));
    }

    #[tokio::test]
    async fn test_upstream_errors_are_classified() {
        let cases = [
            (StatusCode::UNAUTHORIZED, "Invalid Notion API token or insufficient permissions"),
            (StatusCode::NOT_FOUND, "Database not found or integration lacks access"),
            (StatusCode::BAD_REQUEST, "Invalid query parameters: fake upstream failure"),
            (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded. Please try again later."),
            (StatusCode::BAD_GATEWAY, "Notion API error: fake upstream failure"),
        ];

        for (upstream, message) in cases {
            let fake = Arc::new(FakeNotion {
                fail_with: Some(upstream),
                ..Default::default()
            });
            let (status, body) =
                send(app(fake, false), post("/query-database", json!({"databaseId": DB}))).await;
            assert_eq!(status, upstream);
            assert_eq!(body["message"], json!(message));
            assert!(body.get("details").is_none());
        }
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        let mut config = ApiConfig::new(SecretSource::Env {
            var: "NOTION_TOKEN".into(),
        });
        config.base_url = "http://127.0.0.1:9/v1".into();
        config.timeout_secs = 5;
        let client =
            NotionClient::new(&config, Arc::new(StaticToken("secret_test".into()))).unwrap();
        let app = router(AppState::new(Arc::new(client), "2025-09-03", false));

        let (status, body) = send(app, post("/query-database", json!({"databaseId": DB}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], json!(true));
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Notion API error: Network error: "),
            "{body}"
        );
    }

    #[tokio::test]
    async fn test_details_only_in_development() {
        let fake = Arc::new(FakeNotion {
            fail_with: Some(StatusCode::UNAUTHORIZED),
            ..Default::default()
        });

        let (status, body) =
            send(app(fake, true), post("/query-database", json!({"databaseId": DB}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["details"]["code"], json!("fake_error"));
    }

    #[tokio::test]
    async fn test_create_page() {
        let fake = Arc::new(FakeNotion {
            created: Some(
                serde_json::from_value(json!({
                    "id": "new-page",
                    "url": "https://www.notion.so/new-page",
                    "created_time": "2025-09-03T10:00:00.000Z",
                    "last_edited_time": "2025-09-03T10:00:00.000Z",
                    "properties": {"Title": {"id": "title", "type": "title", "title": []}}
                }))
                .unwrap(),
            ),
            ..Default::default()
        });

        let properties = json!({
            "Title": {"title": [{"text": {"content": "Case Title"}}]},
            "Case Number": {"rich_text": [{"text": {"content": "CASE-2025-001"}}]}
        });
        let (status, body) = send(
            app(fake.clone(), false),
            post(
                "/create-page",
                json!({"databaseId": "40c4cef5-c8cd-4cb4-891a-35c3710df6e9", "properties": properties}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["id"], json!("new-page"));
        assert_eq!(body["data"]["api_version"], json!("2025-09-03"));
        assert_eq!(body["data"]["properties"]["Title"]["type"], json!("title"));

        let creates = fake.creates.lock().unwrap();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0]["parent"], json!({"database_id": DB}));
        assert_eq!(creates[0]["properties"], properties);
    }

    #[tokio::test]
    async fn test_create_page_validation() {
        let fake = Arc::new(FakeNotion::default());

        let cases = [
            (json!({"properties": {"Title": {"title": []}}}), "Missing required field: databaseId"),
            (json!({"databaseId": DB}), "Missing required field: properties"),
            (json!({"databaseId": ""}), "Missing required field: databaseId"),
            (json!({"databaseId": "", "properties": {}}), "Missing required field: databaseId"),
            (json!({"databaseId": DB, "properties": {}}), "Missing required field: properties"),
            (json!({"databaseId": DB, "properties": {"Name": {"title": []}}}), "Title property is required"),
            (json!({"databaseId": DB, "properties": {"Title": {"text": "x"}}}), "Title property must have 'title' field"),
        ];

        for (request, message) in cases {
            let (status, body) = send(app(fake.clone(), false), post("/create-page", request)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], json!(message));
        }
        assert!(fake.creates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection() {
        let fake = Arc::new(FakeNotion {
            database: Some(database(json!([{"id": "ds-1", "type": "database"}]))),
            ..Default::default()
        });

        let request = Request::builder()
            .uri(format!("/test-connection?databaseId={DB}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(fake, false), request).await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["id"], json!(DB));
        assert_eq!(data["properties"], json!(["Name", "Status"]));
        assert_eq!(data["is_multi_source"], json!(true));
        assert_eq!(data["data_sources"], json!([{"id": "ds-1", "type": "database"}]));
    }

    #[tokio::test]
    async fn test_connection_single_source_and_errors() {
        let fake = Arc::new(FakeNotion {
            database: Some(database(json!([]))),
            ..Default::default()
        });
        let request = Request::builder()
            .uri(format!("/test-connection?databaseId={DB}"))
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(app(fake, false), request).await;
        assert_eq!(body["data"]["is_multi_source"], json!(false));
        assert!(body["data"].get("data_sources").is_none());

        let request = Request::builder()
            .uri("/test-connection")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(Arc::new(FakeNotion::default()), false), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Missing required query parameter: databaseId"));

        let request = Request::builder()
            .uri(format!("/test-connection?databaseId={DB}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(Arc::new(FakeNotion::default()), false), request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], json!("Database not found or integration lacks access"));
    }

    #[tokio::test]
    async fn test_preflight_and_methods() {
        for uri in ["/test-connection", "/create-page", "/query-database"] {
            let request = Request::builder()
                .method("OPTIONS")
                .uri(uri)
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app(Arc::new(FakeNotion::default()), false), request).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
            assert_eq!(body, Value::Null);
        }

        let request = Request::builder()
            .method("GET")
            .uri("/query-database")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(Arc::new(FakeNotion::default()), false), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["message"], json!("Method GET not allowed"));

        let request = post("/test-connection", json!({}));
        let (status, body) = send(app(Arc::new(FakeNotion::default()), false), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["message"], json!("Method POST not allowed"));
    }
}
