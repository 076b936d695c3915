use crate::AppState;
use crate::envelope::{ApiError, ApiResponse};
use crate::errors::{GatewayError, Operation};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::Method;
use indexmap::IndexMap;
use notion::codec::{self, encode_create_payload};
use notion::types::DataSource;
use notion::validate::{
    ValidationError, validate_database_id, validate_query_params,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

const DATABASE_ID: &str = "databaseId";

#[derive(Debug, Serialize)]
pub(crate) struct ConnectionInfo {
    id: String,
    title: Vec<Value>,
    properties: Vec<String>,
    created_time: Option<String>,
    last_edited_time: Option<String>,
    api_version: String,
    is_multi_source: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_sources: Option<Vec<DataSource>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreatedPage {
    id: String,
    url: Option<String>,
    created_time: Option<String>,
    last_edited_time: Option<String>,
    properties: IndexMap<String, Value>,
    api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_source_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueriedPage {
    id: String,
    created_time: Option<String>,
    last_edited_time: Option<String>,
    url: Option<String>,
    properties: IndexMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QueryResult {
    results: Vec<QueriedPage>,
    next_cursor: Option<String>,
    has_more: bool,
    total_count: usize,
    api_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_source_id: Option<String>,
}

/// Parse a request body into a JSON object. An empty body counts as `{}`.
fn parse_body(body: &Bytes) -> Result<Map<String, Value>, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ValidationError::InvalidJson),
    }
}

/// The `databaseId` field of a body, normalized.
fn database_id_field(body: &Map<String, Value>) -> Result<String, ValidationError> {
    match body.get(DATABASE_ID) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(DATABASE_ID)),
        Some(Value::String(id)) if id.is_empty() => Err(ValidationError::MissingField(DATABASE_ID)),
        Some(Value::String(id)) => validate_database_id(id),
        Some(_) => Err(ValidationError::InvalidDatabaseId),
    }
}

pub(crate) async fn test_connection(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ApiResponse<ConnectionInfo>, ApiError> {
    let result = run_test_connection(&state, &params).await;
    state.finish(Operation::TestConnection, result)
}

async fn run_test_connection(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<ApiResponse<ConnectionInfo>, GatewayError> {
    let raw_id = params
        .get(DATABASE_ID)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingQueryParameter(DATABASE_ID))?;
    let database_id = validate_database_id(raw_id)?;

    tracing::info!(%database_id, "Testing connection for database");

    let database = state
        .notion
        .get_database(&database_id)
        .await
        .map_err(|e| GatewayError::from_notion(e, Operation::TestConnection))?;

    let is_multi_source = database.is_multi_source();
    let info = ConnectionInfo {
        properties: database.property_names(),
        id: database.id,
        title: database.title,
        created_time: database.created_time,
        last_edited_time: database.last_edited_time,
        api_version: state.api_version.to_string(),
        is_multi_source,
        data_sources: is_multi_source.then_some(database.data_sources),
    };

    tracing::info!(%database_id, "Successfully connected to database");
    Ok(ApiResponse::ok(info))
}

pub(crate) async fn create_page(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse<CreatedPage>, ApiError> {
    let result = run_create_page(&state, &body).await;
    state.finish(Operation::CreatePage, result)
}

async fn run_create_page(
    state: &AppState,
    body: &Bytes,
) -> Result<ApiResponse<CreatedPage>, GatewayError> {
    let body = parse_body(body)?;

    if matches!(body.get(DATABASE_ID), None | Some(Value::Null))
        || body.get(DATABASE_ID).and_then(Value::as_str) == Some("")
    {
        return Err(ValidationError::MissingField(DATABASE_ID).into());
    }
    let properties = match body.get("properties") {
        Some(Value::Object(properties)) if !properties.is_empty() => properties.clone(),
        Some(Value::Object(_)) | Some(Value::Null) | None => {
            return Err(ValidationError::MissingField("properties").into());
        }
        Some(_) => return Err(ValidationError::MissingProperties.into()),
    };

    let database_id = database_id_field(&body)?;
    let payload = encode_create_payload(&database_id, properties)?;

    tracing::info!(%database_id, "Creating page in database");

    let data_source_id = state.notion.data_source_id(&database_id).await;
    if let Some(data_source_id) = &data_source_id {
        tracing::info!(%data_source_id, "Using data_source_id");
    }

    let payload = payload.with_data_source(data_source_id.clone()).into_json();
    let page = state
        .notion
        .create_page(&payload)
        .await
        .map_err(|e| GatewayError::from_notion(e, Operation::CreatePage))?;

    tracing::info!(page_id = %page.id, "Successfully created page");

    Ok(ApiResponse::created(CreatedPage {
        id: page.id,
        url: page.url,
        created_time: page.created_time,
        last_edited_time: page.last_edited_time,
        properties: page.properties,
        api_version: state.api_version.to_string(),
        data_source_id,
    }))
}

pub(crate) async fn query_database(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<ApiResponse<QueryResult>, ApiError> {
    let result = run_query_database(&state, &body).await;
    state.finish(Operation::QueryDatabase, result)
}

async fn run_query_database(
    state: &AppState,
    body: &Bytes,
) -> Result<ApiResponse<QueryResult>, GatewayError> {
    let mut body = parse_body(body)?;

    let database_id = database_id_field(&body)?;
    body.remove(DATABASE_ID);
    let mut params = validate_query_params(&body)?;

    tracing::info!(%database_id, ?params, "Querying database");

    let data_source_id = state.notion.data_source_id(&database_id).await;
    if let Some(data_source_id) = &data_source_id {
        tracing::info!(%data_source_id, "Using data_source_id");
        params.data_source_id = Some(data_source_id.clone());
    }

    let response = state
        .notion
        .query_database(&database_id, &params)
        .await
        .map_err(|e| GatewayError::from_notion(e, Operation::QueryDatabase))?;

    let results: Vec<QueriedPage> = response
        .results
        .into_iter()
        .map(|page| QueriedPage {
            properties: page
                .properties
                .iter()
                .map(|(name, raw)| (name.clone(), codec::decode(raw).flatten()))
                .collect(),
            id: page.id,
            created_time: page.created_time,
            last_edited_time: page.last_edited_time,
            url: page.url,
        })
        .collect();

    tracing::info!(%database_id, results = results.len(), "Successfully queried database");

    Ok(ApiResponse::ok(QueryResult {
        total_count: results.len(),
        results,
        next_cursor: response.next_cursor,
        has_more: response.has_more,
        api_version: state.api_version.to_string(),
        data_source_id,
    }))
}

fn method_not_allowed(state: &AppState, operation: Operation, method: Method) -> ApiError {
    state.reject(operation, GatewayError::MethodNotAllowed(method))
}

pub(crate) async fn test_connection_method_not_allowed(
    State(state): State<AppState>,
    method: Method,
) -> ApiError {
    method_not_allowed(&state, Operation::TestConnection, method)
}

pub(crate) async fn create_page_method_not_allowed(
    State(state): State<AppState>,
    method: Method,
) -> ApiError {
    method_not_allowed(&state, Operation::CreatePage, method)
}

pub(crate) async fn query_database_method_not_allowed(
    State(state): State<AppState>,
    method: Method,
) -> ApiError {
    method_not_allowed(&state, Operation::QueryDatabase, method)
}
