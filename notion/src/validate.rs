//! Validation of inbound identifiers and payloads.
//!
//! All functions here are pure. They either return the normalized value or a
//! [`ValidationError`] whose message is safe to show to the caller.

use serde::Serialize;
use serde_json::{Map, Value};

pub const MIN_PAGE_SIZE: u64 = 1;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Name of the property every created page must carry.
pub const TITLE_PROPERTY: &str = "Title";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Database ID is required")]
    MissingDatabaseId,
    #[error("Invalid database ID format. Must be 32 hexadecimal characters.")]
    InvalidDatabaseId,
    #[error("Properties are required")]
    MissingProperties,
    #[error("Title property is required")]
    MissingTitle,
    #[error("Title property must have 'title' field")]
    MalformedTitle,
    #[error("Sorts must be a list")]
    InvalidSorts,
    #[error("Page size must be an integer between 1 and 100")]
    InvalidPageSize,
    #[error("Start cursor must be a string")]
    InvalidStartCursor,
    #[error("Filter must be an object")]
    InvalidFilter,
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Missing required query parameter: {0}")]
    MissingQueryParameter(&'static str),
    #[error("Invalid JSON in request body")]
    InvalidJson,
}

/// Strip hyphens, lowercase, and require exactly 32 hex characters.
pub fn validate_database_id(raw: &str) -> Result<String, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::MissingDatabaseId);
    }

    let clean = raw.replace('-', "").to_ascii_lowercase();
    if clean.len() != 32 || !clean.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidDatabaseId);
    }

    Ok(clean)
}

/// Require a non-empty bag with a `Title` property shaped as `{"title": ...}`.
/// Other properties are returned untouched.
pub fn validate_properties(
    properties: Map<String, Value>,
) -> Result<Map<String, Value>, ValidationError> {
    if properties.is_empty() {
        return Err(ValidationError::MissingProperties);
    }

    let title = properties
        .get(TITLE_PROPERTY)
        .ok_or(ValidationError::MissingTitle)?;

    match title {
        Value::Object(fields) if fields.contains_key("title") => Ok(properties),
        _ => Err(ValidationError::MalformedTitle),
    }
}

/// Query body forwarded to `POST /databases/{id}/query`.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct QueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorts: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_id: Option<String>,
}

/// Pick the recognized query keys out of `params`. Keys outside
/// `sorts`, `page_size`, `start_cursor` and `filter` are dropped.
pub fn validate_query_params(params: &Map<String, Value>) -> Result<QueryParams, ValidationError> {
    let mut validated = QueryParams::default();

    if let Some(sorts) = params.get("sorts") {
        match sorts {
            Value::Array(sorts) => validated.sorts = Some(sorts.clone()),
            _ => return Err(ValidationError::InvalidSorts),
        }
    }

    if let Some(page_size) = params.get("page_size") {
        match page_size.as_u64() {
            Some(size) if (MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) => {
                validated.page_size = Some(size)
            }
            _ => return Err(ValidationError::InvalidPageSize),
        }
    }

    if let Some(cursor) = params.get("start_cursor") {
        match cursor {
            Value::String(cursor) => validated.start_cursor = Some(cursor.clone()),
            Value::Null => {}
            _ => return Err(ValidationError::InvalidStartCursor),
        }
    }

    if let Some(filter) = params.get("filter") {
        match filter {
            Value::Object(filter) => validated.filter = Some(filter.clone()),
            _ => return Err(ValidationError::InvalidFilter),
        }
    }

    Ok(validated)
}
