use crate::codec::{self, PropertyValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A page object as the API returns it, properties still in their raw typed shape.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RawPage {
    pub id: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

/// One database entry with every property decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: String,
    pub created_time: Option<String>,
    pub last_edited_time: Option<String>,
    pub url: Option<String>,
    pub properties: IndexMap<String, PropertyValue>,
}

impl Record {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

impl From<RawPage> for Record {
    fn from(page: RawPage) -> Self {
        let properties = page
            .properties
            .iter()
            .map(|(name, raw)| (name.clone(), codec::decode(raw)))
            .collect();

        Record {
            id: page.id,
            created_time: page.created_time,
            last_edited_time: page.last_edited_time,
            url: page.url,
            properties,
        }
    }
}

/// One page of a database query.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<RawPage>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    // A response without has_more is treated as the last page.
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DataSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Database metadata returned by `GET /databases/{id}`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub title: Vec<Value>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<DataSource>,
}

impl Database {
    pub fn property_names(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    pub fn is_multi_source(&self) -> bool {
        !self.data_sources.is_empty()
    }

    /// Plain text of the first title span, if the database has a title.
    pub fn title_text(&self) -> Option<String> {
        self.title
            .first()
            .and_then(|span| span.get("plain_text"))
            .and_then(Value::as_str)
            .map(String::from)
    }
}
