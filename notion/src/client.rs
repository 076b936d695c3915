use crate::config::ApiConfig;
use crate::error::NotionError;
use crate::metrics_defs::{NOTION_REQUEST_DURATION, NOTION_REQUESTS};
use crate::secrets::TokenSource;
use crate::types::{Database, QueryResponse, RawPage};
use crate::validate::QueryParams;
use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Operations the rest of the system needs from the database API.
#[async_trait]
pub trait NotionApi: Send + Sync {
    async fn get_database(&self, database_id: &str) -> Result<Database, NotionError>;

    async fn query_database(
        &self,
        database_id: &str,
        params: &QueryParams,
    ) -> Result<QueryResponse, NotionError>;

    async fn create_page(&self, payload: &Value) -> Result<RawPage, NotionError>;

    /// First data source of a multi-source database. Lookup failures are
    /// logged and treated as "no data source" so they never fail the caller.
    async fn data_source_id(&self, database_id: &str) -> Option<String> {
        match self.get_database(database_id).await {
            Ok(database) => database.data_sources.into_iter().next().and_then(|ds| ds.id),
            Err(e) => {
                tracing::warn!(database_id, error = %e, "Could not retrieve data_source_id");
                None
            }
        }
    }
}

pub struct NotionClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    token: Arc<dyn TokenSource>,
}

impl NotionClient {
    pub fn new(config: &ApiConfig, token: Arc<dyn TokenSource>) -> Result<Self, NotionError> {
        let base_url = Url::parse(&config.base_url)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(NotionClient {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token,
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, NotionError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        let token = self.token.token().await?;

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("Notion-Version", &self.api_version)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::info!(%method, endpoint, "Making request to Notion");
        let started = Instant::now();

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                counter!(NOTION_REQUESTS, "outcome" => "transport_error").increment(1);
                tracing::error!(%method, endpoint, error = %e, "Notion request failed");
                return Err(NotionError::Transport(e));
            }
        };

        let status = response.status();
        histogram!(NOTION_REQUEST_DURATION).record(started.elapsed().as_secs_f64());
        tracing::info!(%method, endpoint, status = status.as_u16(), "Notion request completed");

        if !status.is_success() {
            counter!(NOTION_REQUESTS, "outcome" => "api_error").increment(1);
            let body = response.json::<Value>().await.ok();
            let err = NotionError::from_response(status, body);
            tracing::error!(status = status.as_u16(), message = %err, "Notion API error");
            return Err(err);
        }

        counter!(NOTION_REQUESTS, "outcome" => "success").increment(1);
        response.json::<T>().await.map_err(NotionError::Decode)
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn get_database(&self, database_id: &str) -> Result<Database, NotionError> {
        self.request::<_, Value>(Method::GET, &format!("/databases/{database_id}"), None)
            .await
    }

    async fn query_database(
        &self,
        database_id: &str,
        params: &QueryParams,
    ) -> Result<QueryResponse, NotionError> {
        self.request(
            Method::POST,
            &format!("/databases/{database_id}/query"),
            Some(params),
        )
        .await
    }

    async fn create_page(&self, payload: &Value) -> Result<RawPage, NotionError> {
        self.request(Method::POST, "/pages", Some(payload)).await
    }
}
