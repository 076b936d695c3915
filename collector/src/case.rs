//! Projection of database records onto the fixed case schema.
//!
//! Each case field is read from the first property, in alias order, that
//! has the expected type and a non-empty value. A record lacking all
//! aliases of a field gets that field's empty value.

use crate::enrich::EnrichmentResult;
use notion::Record;
use notion::codec::{BLOCK_SEPARATOR, DateRange, INLINE_SEPARATOR, PropertyValue, SPAN_SEPARATOR};
use serde::Serialize;

/// Property names accepted for each case field, highest priority first.
#[derive(Clone, Copy, Debug)]
pub struct FieldAliases {
    pub case_name: &'static [&'static str],
    pub case_date: &'static [&'static str],
    pub court: &'static [&'static str],
    pub judge: &'static [&'static str],
    pub case_type: &'static [&'static str],
    pub status: &'static [&'static str],
    pub notes: &'static [&'static str],
}

pub const CASE_ALIASES: FieldAliases = FieldAliases {
    case_name: &["Case Name", "Name"],
    case_date: &["Date", "Case Date"],
    court: &["Court"],
    judge: &["Judge"],
    case_type: &["Case Type", "Type"],
    status: &["Status"],
    notes: &["Notes"],
};

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct NormalizedCase {
    pub id: String,
    pub created_time: Option<String>,
    pub last_edited_time: Option<String>,
    pub case_name: String,
    pub case_date: Option<DateRange>,
    pub court: String,
    pub judge: String,
    pub case_type: String,
    pub status: String,
    pub notes: String,
    pub courtlistener_search: Option<EnrichmentResult>,
}

impl NormalizedCase {
    pub fn from_record(record: &Record) -> Self {
        Self::with_aliases(record, &CASE_ALIASES)
    }

    pub fn with_aliases(record: &Record, aliases: &FieldAliases) -> Self {
        NormalizedCase {
            id: record.id.clone(),
            created_time: record.created_time.clone(),
            last_edited_time: record.last_edited_time.clone(),
            case_name: first_match(record, aliases.case_name, title).unwrap_or_default(),
            case_date: first_match(record, aliases.case_date, date),
            court: first_match(record, aliases.court, |v| rich_text(v, INLINE_SEPARATOR))
                .unwrap_or_default(),
            judge: first_match(record, aliases.judge, |v| rich_text(v, INLINE_SEPARATOR))
                .unwrap_or_default(),
            case_type: first_match(record, aliases.case_type, select).unwrap_or_default(),
            status: first_match(record, aliases.status, select).unwrap_or_default(),
            notes: first_match(record, aliases.notes, |v| rich_text(v, BLOCK_SEPARATOR))
                .unwrap_or_default(),
            courtlistener_search: None,
        }
    }

    /// Start of the case date, if present and non-empty.
    pub fn date_start(&self) -> Option<&str> {
        self.case_date
            .as_ref()
            .and_then(|range| range.start.as_deref())
            .filter(|start| !start.is_empty())
    }
}

fn first_match<T>(
    record: &Record,
    aliases: &[&str],
    extract: impl Fn(&PropertyValue) -> Option<T>,
) -> Option<T> {
    aliases
        .iter()
        .filter_map(|name| record.property(name))
        .find_map(extract)
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn title(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Title(_) => value.plain_text(SPAN_SEPARATOR).and_then(non_empty),
        _ => None,
    }
}

fn rich_text(value: &PropertyValue, separator: &str) -> Option<String> {
    match value {
        PropertyValue::RichText(_) => value.plain_text(separator).and_then(non_empty),
        _ => None,
    }
}

fn select(value: &PropertyValue) -> Option<String> {
    value
        .select_name()
        .filter(|name| !name.is_empty())
        .map(String::from)
}

fn date(value: &PropertyValue) -> Option<DateRange> {
    value.date().cloned()
}
