//! Meilisearch HTTP client.

use std::time::Duration;

use kat_config::SearchConfig;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::documents::{FILTERABLE_ATTRIBUTES, PRIMARY_KEY, ResourceDocument, SEARCHABLE_ATTRIBUTES};
use crate::query::SearchRequest;
use crate::{SearchError, SearchIndex, TaskInfo};

const INDEX_ALREADY_EXISTS: &str = "index_already_exists";

/// Error body returned by Meilisearch on non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Vec<ResourceDocument>,
}

/// Client bound to one Meilisearch index.
pub struct MeilisearchClient {
    http: reqwest::Client,
    base_url: String,
    index: String,
    api_key: Option<String>,
}

impl MeilisearchClient {
    /// # Errors
    ///
    /// Returns [`SearchError::Setup`] if the URL or index name is empty or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        if config.url.trim().is_empty() || config.index.trim().is_empty() {
            return Err(SearchError::Setup("search url and index are required".into()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("katalog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SearchError::Setup(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        })
    }

    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    fn index_url(&self, path: &str) -> String {
        format!(
            "{}/indexes/{}{path}",
            self.base_url,
            urlencoding::encode(&self.index)
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Create the index if missing and apply its attribute settings.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the service is unreachable or rejects the
    /// settings. An index that already exists is not an error.
    pub async fn ensure_index(&self) -> Result<(), SearchError> {
        let resp = self.request(Method::GET, &self.index_url("")).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            let create = self
                .request(Method::POST, &format!("{}/indexes", self.base_url))
                .json(&json!({ "uid": self.index, "primaryKey": PRIMARY_KEY }))
                .send()
                .await?;
            match check_response(create).await {
                Ok(_) => tracing::info!(index = %self.index, "search index created"),
                Err(e) if e.code() == Some(INDEX_ALREADY_EXISTS) => {}
                Err(e) => return Err(e),
            }
        } else {
            check_response(resp).await?;
        }

        let settings = self
            .request(Method::PATCH, &self.index_url("/settings"))
            .json(&settings_body())
            .send()
            .await?;
        let task: TaskInfo = read_json(check_response(settings).await?).await?;
        tracing::debug!(index = %self.index, task = task.task_uid, "index settings enqueued");
        Ok(())
    }
}

fn settings_body() -> Value {
    json!({
        "filterableAttributes": FILTERABLE_ATTRIBUTES,
        "searchableAttributes": SEARCHABLE_ATTRIBUTES,
    })
}

fn search_body(request: &SearchRequest) -> Value {
    json!({
        "q": request.query.text,
        "filter": request.query.filter(),
        "limit": request.limit,
    })
}

/// Map non-success statuses to [`SearchError::Api`], keeping Meilisearch's
/// error code when the body carries one.
async fn check_response(resp: Response) -> Result<Response, SearchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.code, body.message),
        Err(_) => (String::new(), text),
    };
    Err(SearchError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, SearchError> {
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))
}

impl SearchIndex for MeilisearchClient {
    async fn add_documents(
        &self,
        documents: &[ResourceDocument],
        primary_key: &str,
    ) -> Result<TaskInfo, SearchError> {
        let url = format!(
            "{}?primaryKey={}",
            self.index_url("/documents"),
            urlencoding::encode(primary_key)
        );
        let resp = self.request(Method::POST, &url).json(documents).send().await?;
        read_json(check_response(resp).await?).await
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<TaskInfo, SearchError> {
        let resp = self
            .request(Method::POST, &self.index_url("/documents/delete-batch"))
            .json(ids)
            .send()
            .await?;
        read_json(check_response(resp).await?).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<ResourceDocument>, SearchError> {
        let resp = self
            .request(Method::POST, &self.index_url("/search"))
            .json(&search_body(request))
            .send()
            .await?;
        let body: SearchResponse = read_json(check_response(resp).await?).await?;
        Ok(body.hits)
    }
}
