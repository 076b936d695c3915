use async_trait::async_trait;
use axum::http::StatusCode;
use notion::client::NotionApi;
use notion::types::{Database, QueryResponse, RawPage};
use notion::{NotionError, QueryParams};
use serde_json::{Value, json};
use std::sync::Mutex;

pub const DB: &str = "40c4cef5c8cd4cb4891a35c3710df6e9";

/// In-memory stand-in for the database API.
#[derive(Default)]
pub struct FakeNotion {
    pub database: Option<Database>,
    pub query: QueryResponse,
    pub created: Option<RawPage>,
    // When set, query and create fail with this upstream status.
    pub fail_with: Option<StatusCode>,
    pub queries: Mutex<Vec<QueryParams>>,
    pub creates: Mutex<Vec<Value>>,
}

impl FakeNotion {
    fn failure(&self) -> Option<NotionError> {
        self.fail_with.map(|status| {
            NotionError::from_response(
                status,
                Some(json!({"code": "fake_error", "message": "fake upstream failure"})),
            )
        })
    }
}

#[async_trait]
impl NotionApi for FakeNotion {
    async fn get_database(&self, _database_id: &str) -> Result<Database, NotionError> {
        self.database.clone().ok_or_else(|| {
            NotionError::from_response(
                StatusCode::NOT_FOUND,
                Some(json!({"code": "object_not_found", "message": "Could not find database"})),
            )
        })
    }

    async fn query_database(
        &self,
        _database_id: &str,
        params: &QueryParams,
    ) -> Result<QueryResponse, NotionError> {
        self.queries.lock().unwrap().push(params.clone());
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self.query.clone()),
        }
    }

    async fn create_page(&self, payload: &Value) -> Result<RawPage, NotionError> {
        self.creates.lock().unwrap().push(payload.clone());
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(self.created.clone().unwrap_or_default()),
        }
    }
}

pub fn database(data_sources: Value) -> Database {
    serde_json::from_value(json!({
        "id": DB,
        "title": [{"plain_text": "Law Cases"}],
        "properties": {"Name": {"type": "title"}, "Status": {"type": "select"}},
        "created_time": "2025-01-01T00:00:00.000Z",
        "last_edited_time": "2025-02-01T00:00:00.000Z",
        "data_sources": data_sources
    }))
    .unwrap()
}
