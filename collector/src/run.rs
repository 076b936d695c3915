use crate::case::NormalizedCase;
use crate::config::{Config, ConfigError, CourtListenerConfig};
use crate::enrich::{CourtListenerClient, EnrichError, Enricher};
use crate::metrics_defs::{COLLECT_CASES, COLLECT_DURATION, COLLECT_RUNS};
use crate::persist::{FilesystemStore, PersistError, SnapshotStore};
use crate::snapshot::{SearchStats, SnapshotBuilder};
use chrono::Utc;
use notion::client::NotionApi;
use notion::secrets::CachedToken;
use notion::{NotionClient, NotionError, fetch_all};
use shared::{counter, gauge, histogram};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Steps of a run that can fail it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    FetchMetadata,
    FetchPages,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::FetchMetadata => write!(f, "fetching database metadata"),
            Stage::FetchPages => write!(f, "fetching database pages"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CollectError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("could not build Notion client: {0}")]
    Client(#[source] NotionError),
    #[error("could not build search client: {0}")]
    Search(#[from] EnrichError),
    #[error("error {stage}: {source}")]
    Fetch {
        stage: Stage,
        #[source]
        source: NotionError,
    },
    #[error("could not persist snapshot: {0}")]
    Persist(#[from] PersistError),
}

/// Totals of a successful run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunReport {
    pub total_cases: usize,
    pub searches: SearchStats,
}

/// One batch: metadata, every page, optional enrichment, then both
/// documents. A fetch failure replaces the documents with the error pair
/// and fails the run. Enrichment failures never do.
pub struct Collector {
    notion: Arc<dyn NotionApi>,
    enricher: Enricher,
    store: Box<dyn SnapshotStore>,
    database_id: String,
}

impl Collector {
    pub fn new(
        notion: Arc<dyn NotionApi>,
        enricher: Enricher,
        store: Box<dyn SnapshotStore>,
        database_id: String,
    ) -> Self {
        Collector {
            notion,
            enricher,
            store,
            database_id,
        }
    }

    pub async fn run(&self) -> Result<RunReport, CollectError> {
        let started = Instant::now();
        let builder = SnapshotBuilder::new(Utc::now());

        let result = self.collect(&builder).await;
        histogram!(COLLECT_DURATION).record(started.elapsed().as_secs_f64());

        match result {
            Ok(report) => {
                counter!(COLLECT_RUNS, "outcome" => "success").increment(1);
                gauge!(COLLECT_CASES).set(report.total_cases as f64);
                tracing::info!(
                    total_cases = report.total_cases,
                    total_searches = report.searches.total_searches,
                    successful_searches = report.searches.successful_searches,
                    "Collection run complete"
                );
                Ok(report)
            }
            Err(err @ CollectError::Fetch { .. }) => {
                counter!(COLLECT_RUNS, "outcome" => "error").increment(1);
                tracing::error!(error = %err, "Collection run failed, writing error snapshot");
                let (snapshot, summary) = builder.error(&err.to_string());
                if let Err(persist) = self.store.store(&snapshot, &summary) {
                    tracing::error!(error = %persist, "Could not write error snapshot");
                }
                Err(err)
            }
            Err(err) => {
                counter!(COLLECT_RUNS, "outcome" => "error").increment(1);
                tracing::error!(error = %err, "Collection run failed");
                Err(err)
            }
        }
    }

    async fn collect(&self, builder: &SnapshotBuilder) -> Result<RunReport, CollectError> {
        let database_id = self.database_id.as_str();

        tracing::info!(database_id, "Fetching database metadata");
        let database = self
            .notion
            .get_database(database_id)
            .await
            .map_err(|source| CollectError::Fetch {
                stage: Stage::FetchMetadata,
                source,
            })?;

        let records = fetch_all(self.notion.as_ref(), database_id)
            .await
            .map_err(|source| CollectError::Fetch {
                stage: Stage::FetchPages,
                source,
            })?;

        let cases: Vec<NormalizedCase> = records.iter().map(NormalizedCase::from_record).collect();
        let outcomes = self.enricher.enrich_all(&cases).await;

        let (snapshot, summary) =
            builder.build(&database, cases, outcomes, self.enricher.enabled());
        self.store.store(&snapshot, &summary)?;

        Ok(RunReport {
            total_cases: summary.total_cases,
            searches: summary.courtlistener_searches,
        })
    }
}

async fn build_enricher(config: &CourtListenerConfig) -> Result<Enricher, CollectError> {
    let Some(source) = &config.api_key else {
        return Ok(Enricher::disabled());
    };

    match source.resolve().await {
        Ok(api_key) => {
            let client = CourtListenerClient::new(config, api_key)?;
            Ok(Enricher::new(Some(Arc::new(client)), config.max_concurrency))
        }
        Err(e) => {
            tracing::warn!(error = %e, "CourtListener API key unavailable, skipping case searches");
            Ok(Enricher::disabled())
        }
    }
}

/// Build the clients described by `config` and perform one run.
pub async fn run(config: &Config) -> Result<RunReport, CollectError> {
    let database_id = config.validate()?;

    let token = Arc::new(CachedToken::new(config.notion.token.clone()));
    let notion = NotionClient::new(&config.notion, token).map_err(CollectError::Client)?;
    let enricher = build_enricher(&config.courtlistener).await?;
    let store = FilesystemStore::new(&config.output_dir);

    Collector::new(Arc::new(notion), enricher, Box::new(store), database_id)
        .run()
        .await
}
