//! Batch collection of the case database into JSON snapshots.
//!
//! A run reads the database metadata and every record, projects records
//! onto the case schema, optionally enriches each case with case law search
//! hits and writes `notion-data.json` plus `summary.json`.

pub mod case;
pub mod config;
pub mod enrich;
pub mod metrics_defs;
pub mod persist;
pub mod run;
pub mod snapshot;

pub use run::{CollectError, Collector, RunReport, run};
