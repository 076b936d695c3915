//! The two persisted views of a run: the full dataset and its summary.
//!
//! A run produces either a success snapshot or an error snapshot. Both
//! share the same top-level keys so readers never see a partial document.

use crate::case::NormalizedCase;
use crate::enrich::Outcome;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use notion::Database;
use serde::Serialize;

pub const SNAPSHOT_VERSION: &str = "2.0";
pub const SNAPSHOT_SOURCE: &str = "notion-law-data-collector-script";

/// Cases listed in `recent_cases`.
pub const RECENT_CASES: usize = 5;

const DEFAULT_TITLE: &str = "Notion Database";
const ERROR_TITLE: &str = "Error";

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStatus {
    Success,
    Error,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DatabaseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub total_entries: usize,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct Features {
    pub courtlistener_integration: bool,
    pub pagination_support: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Metadata {
    pub version: &'static str,
    pub source: &'static str,
    #[serde(rename = "fetchedAt")]
    pub fetched_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
}

/// Contents of `notion-data.json`.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub last_updated: String,
    pub status: SnapshotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub database_info: DatabaseInfo,
    pub entries: Vec<NormalizedCase>,
    pub metadata: Metadata,
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq)]
pub struct SearchStats {
    pub total_searches: usize,
    pub successful_searches: usize,
    /// Percentage of attempted searches with at least one hit, two decimals.
    pub search_rate: f64,
}

impl SearchStats {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Self {
        let (total, successful) = outcomes
            .into_iter()
            .filter(|outcome| outcome.attempted())
            .fold((0, 0), |(total, successful), outcome| {
                (total + 1, successful + usize::from(outcome.successful()))
            });

        SearchStats {
            total_searches: total,
            successful_searches: successful,
            search_rate: search_rate(successful, total),
        }
    }
}

fn search_rate(successful: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = successful as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

/// Contents of `summary.json`.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Summary {
    pub last_updated: String,
    pub total_cases: usize,
    pub status_distribution: IndexMap<String, usize>,
    pub case_type_distribution: IndexMap<String, usize>,
    pub courtlistener_searches: SearchStats,
    pub recent_cases: Vec<String>,
}

/// Count non-empty values in first-seen order.
fn histogram<'a>(values: impl Iterator<Item = &'a str>) -> IndexMap<String, usize> {
    let mut counts = IndexMap::new();
    for value in values.filter(|v| !v.is_empty()) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Names of the most recent cases by date, undated cases last, ties in
/// input order.
fn recent_cases(cases: &[NormalizedCase]) -> Vec<String> {
    let mut ordered: Vec<&NormalizedCase> = cases.iter().collect();
    ordered.sort_by(|a, b| b.date_start().cmp(&a.date_start()));
    ordered
        .into_iter()
        .take(RECENT_CASES)
        .map(|case| case.case_name.clone())
        .collect()
}

/// Builds snapshots stamped with one fixed time.
pub struct SnapshotBuilder {
    timestamp: String,
}

impl SnapshotBuilder {
    pub fn new(now: DateTime<Utc>) -> Self {
        SnapshotBuilder {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// Attach each outcome to its case and summarize the batch. `outcomes`
    /// is positionally aligned with `cases`; a case without an outcome counts
    /// as skipped and extra outcomes are ignored.
    pub fn build(
        &self,
        database: &Database,
        mut cases: Vec<NormalizedCase>,
        outcomes: Vec<Outcome>,
        courtlistener_integration: bool,
    ) -> (Snapshot, Summary) {
        let mut outcomes = outcomes.into_iter();
        let mut attached = Vec::with_capacity(cases.len());
        for case in cases.iter_mut() {
            let outcome = outcomes.next().unwrap_or(Outcome::Skipped);
            case.courtlistener_search = outcome.clone().into_result();
            attached.push(outcome);
        }
        let searches = SearchStats::from_outcomes(&attached);

        let summary = Summary {
            last_updated: self.timestamp.clone(),
            total_cases: cases.len(),
            status_distribution: histogram(cases.iter().map(|c| c.status.as_str())),
            case_type_distribution: histogram(cases.iter().map(|c| c.case_type.as_str())),
            courtlistener_searches: searches,
            recent_cases: recent_cases(&cases),
        };

        let snapshot = Snapshot {
            last_updated: self.timestamp.clone(),
            status: SnapshotStatus::Success,
            error: None,
            database_info: DatabaseInfo {
                id: Some(database.id.clone()),
                title: database
                    .title_text()
                    .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                url: Some(database.url.clone().unwrap_or_default()),
                total_entries: cases.len(),
            },
            entries: cases,
            metadata: Metadata {
                version: SNAPSHOT_VERSION,
                source: SNAPSHOT_SOURCE,
                fetched_at: self.timestamp.clone(),
                features: Some(Features {
                    courtlistener_integration,
                    pagination_support: true,
                }),
            },
        };

        (snapshot, summary)
    }

    /// The well-formed pair written when a run fails.
    pub fn error(&self, message: &str) -> (Snapshot, Summary) {
        let snapshot = Snapshot {
            last_updated: self.timestamp.clone(),
            status: SnapshotStatus::Error,
            error: Some(message.to_string()),
            database_info: DatabaseInfo {
                id: None,
                title: ERROR_TITLE.to_string(),
                url: None,
                total_entries: 0,
            },
            entries: Vec::new(),
            metadata: Metadata {
                version: SNAPSHOT_VERSION,
                source: SNAPSHOT_SOURCE,
                fetched_at: self.timestamp.clone(),
                features: None,
            },
        };

        let summary = Summary {
            last_updated: self.timestamp.clone(),
            total_cases: 0,
            status_distribution: IndexMap::new(),
            case_type_distribution: IndexMap::new(),
            courtlistener_searches: SearchStats::default(),
            recent_cases: Vec::new(),
        };

        (snapshot, summary)
    }
}
