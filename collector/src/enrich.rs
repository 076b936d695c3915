//! Best-effort case law lookups for collected cases.
//!
//! A failed search never fails the run: it is logged and the case simply
//! carries no search result.

use crate::case::NormalizedCase;
use crate::config::CourtListenerConfig;
use crate::metrics_defs::ENRICH_SEARCHES;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::counter;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Hits kept per search, whatever the upstream returns.
pub const MAX_HITS: usize = 5;

const SEARCH_FIELDS: &str = "caseName,dateFiled,court,docketNumber,absolute_url,cluster";

#[derive(thiserror::Error, Debug)]
pub enum EnrichError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SearchHit {
    pub case_name: String,
    pub date_filed: Option<String>,
    pub court: String,
    pub docket_number: Option<String>,
    pub url: Option<String>,
    pub cluster_id: Option<Value>,
}

impl SearchHit {
    fn from_raw(raw: &Value) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(String::from);

        // court and cluster come back either expanded or as bare values.
        let court = match raw.get("court") {
            Some(Value::Object(court)) => court
                .get("full_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some(Value::String(court)) => court.clone(),
            _ => String::new(),
        };
        let cluster_id = match raw.get("cluster") {
            Some(Value::Object(cluster)) => cluster.get("id").cloned(),
            Some(Value::Null) | None => None,
            Some(scalar) => Some(scalar.clone()),
        };

        SearchHit {
            case_name: text("caseName").unwrap_or_default(),
            date_filed: text("dateFiled"),
            court,
            docket_number: text("docketNumber"),
            url: text("absolute_url"),
            cluster_id,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct EnrichmentResult {
    /// Upstream's declared total, independent of how many hits were kept.
    pub total_results: u64,
    pub results: Vec<SearchHit>,
    pub search_query: String,
    pub searched_at: String,
}

impl EnrichmentResult {
    /// Shape a raw search response. A response without `results` carries
    /// nothing usable and yields `None`.
    pub fn from_response(query: &str, body: &Value, searched_at: String) -> Option<Self> {
        let hits = body.get("results")?.as_array()?;

        Some(EnrichmentResult {
            total_results: body.get("count").and_then(Value::as_u64).unwrap_or(0),
            results: hits.iter().take(MAX_HITS).map(SearchHit::from_raw).collect(),
            search_query: query.to_string(),
            searched_at,
        })
    }
}

/// What happened when looking up one case.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// No request was made.
    Skipped,
    /// A request was made but produced no usable result.
    Unavailable,
    Found(EnrichmentResult),
}

impl Outcome {
    pub fn attempted(&self) -> bool {
        !matches!(self, Outcome::Skipped)
    }

    /// At least one hit came back.
    pub fn successful(&self) -> bool {
        matches!(self, Outcome::Found(result) if !result.results.is_empty())
    }

    pub fn into_result(self) -> Option<EnrichmentResult> {
        match self {
            Outcome::Found(result) => Some(result),
            _ => None,
        }
    }
}

/// The case law search service.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Raw JSON body of a search for `query`.
    async fn search(&self, query: &str) -> Result<Value, EnrichError>;
}

pub struct CourtListenerClient {
    client: reqwest::Client,
    search_url: Url,
    api_key: String,
}

impl CourtListenerClient {
    pub fn new(config: &CourtListenerConfig, api_key: String) -> Result<Self, EnrichError> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let search_url = Url::parse(&base)?.join("search/")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(CourtListenerClient {
            client,
            search_url,
            api_key,
        })
    }
}

#[async_trait]
impl SearchApi for CourtListenerClient {
    async fn search(&self, query: &str) -> Result<Value, EnrichError> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "o")
            .append_pair("format", "json")
            .append_pair("fields", SEARCH_FIELDS)
            .append_pair("page_size", &MAX_HITS.to_string());

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .send()
            .await?;
        tracing::info!(
            endpoint = "/search/",
            status = response.status().as_u16(),
            "CourtListener request completed"
        );
        let response = response.error_for_status()?;

        Ok(response.json().await?)
    }
}

/// Runs searches for a batch of cases, at most `max_concurrency` at a time.
pub struct Enricher {
    api: Option<Arc<dyn SearchApi>>,
    max_concurrency: usize,
}

impl Enricher {
    pub fn new(api: Option<Arc<dyn SearchApi>>, max_concurrency: usize) -> Self {
        Enricher {
            api,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// An enricher that never searches.
    pub fn disabled() -> Self {
        Self::new(None, 1)
    }

    pub fn enabled(&self) -> bool {
        self.api.is_some()
    }

    pub async fn search(&self, case_name: &str) -> Outcome {
        let Some(api) = &self.api else {
            return Outcome::Skipped;
        };
        if case_name.trim().is_empty() {
            return Outcome::Skipped;
        }

        tracing::debug!(case_name, "Searching CourtListener");
        let outcome = match api.search(case_name).await {
            Ok(body) => {
                let searched_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
                match EnrichmentResult::from_response(case_name, &body, searched_at) {
                    Some(result) => {
                        tracing::debug!(case_name, hits = result.results.len(), "Search returned");
                        Outcome::Found(result)
                    }
                    None => Outcome::Unavailable,
                }
            }
            Err(e) => {
                tracing::warn!(case_name, error = %e, "Error searching CourtListener");
                Outcome::Unavailable
            }
        };

        let label = match &outcome {
            Outcome::Found(_) if outcome.successful() => "hit",
            Outcome::Found(_) => "empty",
            _ => "unavailable",
        };
        counter!(ENRICH_SEARCHES, "outcome" => label).increment(1);
        outcome
    }

    /// One outcome per case, in input order regardless of completion order.
    pub async fn enrich_all(&self, cases: &[NormalizedCase]) -> Vec<Outcome> {
        if !self.enabled() {
            tracing::info!("CourtListener API key not configured, skipping case searches");
            return vec![Outcome::Skipped; cases.len()];
        }

        futures::stream::iter(cases.iter().map(|case| self.search(&case.case_name)))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}
