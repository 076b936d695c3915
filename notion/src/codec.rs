//! Mapping between the API's typed property objects and flat values.
//!
//! Every property arrives as `{"type": "<tag>", "<tag>": <payload>, ...}`.
//! Decoding dispatches on the tag; tags we do not know, and known tags whose
//! payload is missing or has an unexpected shape, decode to
//! [`PropertyValue::Unknown`] carrying the raw object so nothing is lost and
//! schema changes upstream never fail a batch.
//!
//! Span separators:
//! - [`SPAN_SEPARATOR`] (empty) when spans are pieces of one run of text, as
//!   in titles and flattened API responses.
//! - [`INLINE_SEPARATOR`] (a space) for short inline fields such as court or judge.
//! - [`BLOCK_SEPARATOR`] (a newline) for free-text fields such as notes.

use crate::validate::{ValidationError, validate_properties};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, json};

pub const SPAN_SEPARATOR: &str = "";
pub const INLINE_SEPARATOR: &str = " ";
pub const BLOCK_SEPARATOR: &str = "\n";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TextSpan {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SelectOption {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Title(Vec<TextSpan>),
    RichText(Vec<TextSpan>),
    Select(Option<SelectOption>),
    MultiSelect(Vec<SelectOption>),
    Date(Option<DateRange>),
    Number(Option<Number>),
    Checkbox(bool),
    Unknown(Value),
}

fn payload<T: DeserializeOwned>(value: &Value) -> Option<T> {
    T::deserialize(value).ok()
}

/// Decode one raw property object. Never fails.
pub fn decode(raw: &Value) -> PropertyValue {
    let Some(tag) = raw.get("type").and_then(Value::as_str) else {
        return PropertyValue::Unknown(raw.clone());
    };

    let decoded = raw.get(tag).and_then(|body| match tag {
        "title" => payload(body).map(PropertyValue::Title),
        "rich_text" => payload(body).map(PropertyValue::RichText),
        "select" => payload(body).map(PropertyValue::Select),
        "multi_select" => payload(body).map(PropertyValue::MultiSelect),
        "date" => payload(body).map(PropertyValue::Date),
        "number" => payload(body).map(PropertyValue::Number),
        "checkbox" => payload(body).map(PropertyValue::Checkbox),
        _ => None,
    });

    decoded.unwrap_or_else(|| PropertyValue::Unknown(raw.clone()))
}

impl PropertyValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Title(_) => "title",
            PropertyValue::RichText(_) => "rich_text",
            PropertyValue::Select(_) => "select",
            PropertyValue::MultiSelect(_) => "multi_select",
            PropertyValue::Date(_) => "date",
            PropertyValue::Number(_) => "number",
            PropertyValue::Checkbox(_) => "checkbox",
            PropertyValue::Unknown(_) => "unknown",
        }
    }

    /// Joined plain text of a title or rich text property.
    pub fn plain_text(&self, separator: &str) -> Option<String> {
        match self {
            PropertyValue::Title(spans) | PropertyValue::RichText(spans) => Some(
                spans
                    .iter()
                    .map(|span| span.plain_text.as_str())
                    .collect::<Vec<_>>()
                    .join(separator),
            ),
            _ => None,
        }
    }

    pub fn select_name(&self) -> Option<&str> {
        match self {
            PropertyValue::Select(Some(option)) => option.name.as_deref(),
            _ => None,
        }
    }

    pub fn date(&self) -> Option<&DateRange> {
        match self {
            PropertyValue::Date(range) => range.as_ref(),
            _ => None,
        }
    }

    /// Flat, UI-friendly JSON value used in query responses.
    pub fn flatten(&self) -> Value {
        match self {
            PropertyValue::Title(_) | PropertyValue::RichText(_) => {
                Value::String(self.plain_text(SPAN_SEPARATOR).unwrap_or_default())
            }
            PropertyValue::Select(option) => option
                .as_ref()
                .and_then(|o| o.name.clone())
                .map_or(Value::Null, Value::String),
            PropertyValue::MultiSelect(options) => Value::Array(
                options
                    .iter()
                    .map(|o| o.name.clone().map_or(Value::Null, Value::String))
                    .collect(),
            ),
            PropertyValue::Date(range) => range
                .as_ref()
                .and_then(|r| r.start.clone())
                .map_or(Value::Null, Value::String),
            PropertyValue::Number(number) => number.clone().map_or(Value::Null, Value::Number),
            PropertyValue::Checkbox(checked) => Value::Bool(*checked),
            PropertyValue::Unknown(raw) => raw.clone(),
        }
    }
}

/// A validated body for `POST /pages`.
#[derive(Clone, Debug, PartialEq)]
pub struct CreatePayload {
    database_id: String,
    data_source_id: Option<String>,
    properties: Map<String, Value>,
}

impl CreatePayload {
    /// Target a specific data source of a multi-source database.
    pub fn with_data_source(mut self, data_source_id: Option<String>) -> Self {
        self.data_source_id = data_source_id;
        self
    }

    pub fn into_json(self) -> Value {
        let mut parent = Map::new();
        parent.insert("database_id".into(), Value::String(self.database_id));
        if let Some(data_source_id) = self.data_source_id {
            parent.insert("data_source_id".into(), Value::String(data_source_id));
        }

        json!({
            "parent": parent,
            "properties": self.properties,
        })
    }
}

/// Check the property bag for a `Title` property with a `title` field and
/// wrap it for creation. All other properties pass through as is.
pub fn encode_create_payload(
    database_id: &str,
    properties: Map<String, Value>,
) -> Result<CreatePayload, ValidationError> {
    Ok(CreatePayload {
        database_id: database_id.to_string(),
        data_source_id: None,
        properties: validate_properties(properties)?,
    })
}
