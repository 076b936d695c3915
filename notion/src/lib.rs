//! Client and data handling for the external document database API.
//!
//! Holds everything that talks to, or interprets data from, the database
//! service: the transport trait and its HTTP implementation, the typed
//! property codec, inbound request validation and the cursor-driven
//! "fetch every record" loop.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics_defs;
pub mod secrets;
pub mod types;
pub mod validate;

pub use client::{NotionApi, NotionClient};
pub use codec::PropertyValue;
pub use error::NotionError;
pub use fetch::fetch_all;
pub use types::{Database, QueryResponse, Record};
pub use validate::{QueryParams, ValidationError};

/// API version tag sent on every request and echoed in handler responses.
pub const DEFAULT_API_VERSION: &str = "2025-09-03";
