//! BigQuery REST catalog provider.
//!
//! Uses four read-only endpoints of the BigQuery v2 API:
//! - `GET projects/{p}/datasets`
//! - `GET projects/{p}/datasets/{d}`
//! - `GET projects/{p}/datasets/{d}/tables`
//! - `GET projects/{p}/datasets/{d}/tables/{t}`
//!
//! Only top-level schema fields become columns; nested `RECORD` children are
//! not expanded.

use std::time::Duration;

use kat_config::WarehouseConfig;
use kat_secrets::ServiceAccountKey;
use serde::Deserialize;

use crate::auth::ServiceAccountAuth;
use crate::error::ProviderError;
use crate::http::{check_response, read_json};
use crate::{
    CatalogProvider, ColumnSchema, DatasetMetadata, DatasetRef, Page, TableMetadata, TableRef,
};

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<DatasetListEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetListEntry {
    dataset_reference: DatasetReference,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference {
    project_id: String,
    dataset_id: String,
}

#[derive(Deserialize)]
struct DatasetResource {
    description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableList {
    #[serde(default)]
    tables: Vec<TableListEntry>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableListEntry {
    table_reference: TableReference,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResource {
    description: Option<String>,
    /// BigQuery encodes int64 as a JSON string.
    num_rows: Option<String>,
    schema: Option<TableSchema>,
}

#[derive(Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    description: Option<String>,
}

// ── Mapping ────────────────────────────────────────────────────────

fn dataset_page(list: DatasetList) -> Page<DatasetRef> {
    Page {
        items: list
            .datasets
            .into_iter()
            .map(|d| DatasetRef {
                project_id: d.dataset_reference.project_id,
                dataset_id: d.dataset_reference.dataset_id,
            })
            .collect(),
        next_page_token: list.next_page_token,
    }
}

fn table_page(list: TableList) -> Page<TableRef> {
    Page {
        items: list
            .tables
            .into_iter()
            .map(|t| TableRef {
                project_id: t.table_reference.project_id,
                dataset_id: t.table_reference.dataset_id,
                table_id: t.table_reference.table_id,
            })
            .collect(),
        next_page_token: list.next_page_token,
    }
}

fn parse_row_count(raw: Option<&str>) -> Result<i64, ProviderError> {
    raw.map_or(Ok(0), |s| {
        s.parse::<i64>()
            .map_err(|e| ProviderError::Parse(format!("numRows '{s}': {e}")))
    })
}

fn table_metadata(resource: TableResource) -> Result<TableMetadata, ProviderError> {
    let row_count = parse_row_count(resource.num_rows.as_deref())?;
    let columns = resource
        .schema
        .map(|s| s.fields)
        .unwrap_or_default()
        .into_iter()
        .map(|f| ColumnSchema {
            name: f.name,
            column_type: f.field_type,
            description: f.description.unwrap_or_default(),
        })
        .collect();
    Ok(TableMetadata {
        description: resource.description.unwrap_or_default(),
        row_count,
        columns,
    })
}

// ── Client ─────────────────────────────────────────────────────────

/// Where bearer tokens come from.
#[derive(Debug)]
enum TokenSource {
    ServiceAccount(ServiceAccountAuth),
    /// Fixed token, or none at all for local emulators.
    Static(Option<String>),
}

/// BigQuery catalog reader for one GCP project.
#[derive(Debug)]
pub struct BigQueryClient {
    http: reqwest::Client,
    base_url: String,
    project: String,
    page_size: u32,
    tokens: TokenSource,
}

impl BigQueryClient {
    /// Build a client authenticated with a service account key.
    ///
    /// `project` defaults to the key's own `project_id`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Http` if the HTTP client cannot be built.
    pub fn with_service_account(
        config: &WarehouseConfig,
        key: ServiceAccountKey,
        project: Option<String>,
    ) -> Result<Self, ProviderError> {
        let http = Self::http_client(config)?;
        let project = project.unwrap_or_else(|| key.project_id.clone());
        let auth = ServiceAccountAuth::new(http.clone(), key, config.token_uri_override());
        Ok(Self::assemble(http, config, project, TokenSource::ServiceAccount(auth)))
    }

    /// Build a client with a fixed bearer token, or none (`bigquery-emulator`).
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Http` if the HTTP client cannot be built.
    pub fn with_static_token(
        config: &WarehouseConfig,
        project: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, ProviderError> {
        let http = Self::http_client(config)?;
        Ok(Self::assemble(http, config, project.into(), TokenSource::Static(token)))
    }

    fn http_client(config: &WarehouseConfig) -> Result<reqwest::Client, ProviderError> {
        Ok(reqwest::Client::builder()
            .user_agent(concat!("katalog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?)
    }

    fn assemble(
        http: reqwest::Client,
        config: &WarehouseConfig,
        project: String,
        tokens: TokenSource,
    ) -> Self {
        Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            project,
            page_size: config.page_size,
            tokens,
        }
    }

    /// GCP project being read.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    fn datasets_url(&self) -> String {
        format!(
            "{}/projects/{}/datasets",
            self.base_url,
            urlencoding::encode(&self.project)
        )
    }

    fn dataset_url(&self, dataset: &DatasetRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}",
            self.base_url,
            urlencoding::encode(&dataset.project_id),
            urlencoding::encode(&dataset.dataset_id)
        )
    }

    fn table_url(&self, table: &TableRef) -> String {
        format!(
            "{}/projects/{}/datasets/{}/tables/{}",
            self.base_url,
            urlencoding::encode(&table.project_id),
            urlencoding::encode(&table.dataset_id),
            urlencoding::encode(&table.table_id)
        )
    }

    fn paged(&self, url: String, page_token: Option<&str>) -> String {
        let mut url = format!("{url}?maxResults={}", self.page_size);
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ProviderError> {
        let mut request = self.http.get(url);
        match &self.tokens {
            TokenSource::ServiceAccount(auth) => {
                request = request.bearer_auth(auth.access_token().await?);
            }
            TokenSource::Static(Some(token)) => request = request.bearer_auth(token),
            TokenSource::Static(None) => {}
        }
        tracing::trace!(url, "bigquery request");
        check_response(request.send().await?).await
    }
}

impl CatalogProvider for BigQueryClient {
    async fn list_datasets(
        &self,
        page_token: Option<&str>,
    ) -> Result<Page<DatasetRef>, ProviderError> {
        let url = self.paged(self.datasets_url(), page_token);
        let list: DatasetList = read_json(self.get(&url).await?, "dataset list").await?;
        Ok(dataset_page(list))
    }

    async fn dataset_metadata(
        &self,
        dataset: &DatasetRef,
    ) -> Result<DatasetMetadata, ProviderError> {
        let url = self.dataset_url(dataset);
        let resource: DatasetResource = read_json(self.get(&url).await?, "dataset").await?;
        Ok(DatasetMetadata {
            description: resource.description.unwrap_or_default(),
        })
    }

    async fn list_tables(
        &self,
        dataset: &DatasetRef,
        page_token: Option<&str>,
    ) -> Result<Page<TableRef>, ProviderError> {
        let url = self.paged(format!("{}/tables", self.dataset_url(dataset)), page_token);
        let list: TableList = read_json(self.get(&url).await?, "table list").await?;
        Ok(table_page(list))
    }

    async fn table_metadata(&self, table: &TableRef) -> Result<TableMetadata, ProviderError> {
        let url = self.table_url(table);
        let resource: TableResource = read_json(self.get(&url).await?, "table").await?;
        table_metadata(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock_response;
    use pretty_assertions::assert_eq;

    const DATASET_LIST: &str = r#"{
        "kind": "bigquery#datasetList",
        "etag": "abc",
        "datasets": [
            {
                "kind": "bigquery#dataset",
                "id": "acme-analytics:sales",
                "datasetReference": { "datasetId": "sales", "projectId": "acme-analytics" },
                "location": "EU"
            },
            {
                "kind": "bigquery#dataset",
                "id": "acme-analytics:marketing",
                "datasetReference": { "datasetId": "marketing", "projectId": "acme-analytics" },
                "location": "EU"
            }
        ],
        "nextPageToken": "CgVzYWxlcw"
    }"#;

    const TABLE: &str = r#"{
        "kind": "bigquery#table",
        "id": "acme-analytics:sales.orders",
        "tableReference": {
            "projectId": "acme-analytics",
            "datasetId": "sales",
            "tableId": "orders"
        },
        "description": "One row per order",
        "numRows": "1048576",
        "numBytes": "9000000",
        "schema": {
            "fields": [
                { "name": "order_id", "type": "INTEGER", "mode": "REQUIRED" },
                { "name": "amount", "type": "NUMERIC", "description": "Gross total" },
                {
                    "name": "customer",
                    "type": "RECORD",
                    "fields": [ { "name": "email", "type": "STRING" } ]
                }
            ]
        }
    }"#;

    fn client() -> BigQueryClient {
        let config = WarehouseConfig {
            api_base_url: "http://localhost:9050/bigquery/v2/".into(),
            page_size: 50,
            ..WarehouseConfig::default()
        };
        BigQueryClient::with_static_token(&config, "acme analytics", None).unwrap()
    }

    #[test]
    fn parse_dataset_list() {
        let page = dataset_page(serde_json::from_str(DATASET_LIST).unwrap());
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].dataset_id, "sales");
        assert_eq!(page.items[1].project_id, "acme-analytics");
        assert_eq!(page.next_page_token.as_deref(), Some("CgVzYWxlcw"));
    }

    #[test]
    fn empty_project_has_no_datasets_field() {
        let list = serde_json::from_str(r#"{"kind":"bigquery#datasetList"}"#).unwrap();
        let page = dataset_page(list);
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn parse_table_list() {
        let json = r#"{
            "tables": [
                {
                    "tableReference": {
                        "projectId": "p", "datasetId": "sales", "tableId": "orders"
                    },
                    "type": "TABLE"
                },
                {
                    "tableReference": {
                        "projectId": "p", "datasetId": "sales", "tableId": "refunds"
                    },
                    "type": "VIEW"
                }
            ],
            "totalItems": 2
        }"#;
        let page = table_page(serde_json::from_str(json).unwrap());
        assert_eq!(page.items[1].table_id, "refunds");
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn table_metadata_keeps_top_level_fields_only() {
        let meta = table_metadata(serde_json::from_str(TABLE).unwrap()).unwrap();
        assert_eq!(meta.description, "One row per order");
        assert_eq!(meta.row_count, 1_048_576);
        let names: Vec<_> = meta.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "amount", "customer"]);
        assert_eq!(meta.columns[2].column_type, "RECORD");
        assert_eq!(meta.columns[1].description, "Gross total");
        assert_eq!(meta.columns[0].description, "");
    }

    #[test]
    fn missing_num_rows_is_zero() {
        let resource = serde_json::from_str(r#"{"kind":"bigquery#table"}"#).unwrap();
        let meta = table_metadata(resource).unwrap();
        assert_eq!(meta.row_count, 0);
        assert!(meta.columns.is_empty());
    }

    #[test]
    fn non_numeric_num_rows_is_parse_error() {
        let err = parse_row_count(Some("lots")).unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[test]
    fn urls_are_encoded_and_paged() {
        let client = client();
        assert_eq!(
            client.paged(client.datasets_url(), None),
            "http://localhost:9050/bigquery/v2/projects/acme%20analytics/datasets?maxResults=50"
        );
        let ds = DatasetRef {
            project_id: "p".into(),
            dataset_id: "sales".into(),
        };
        assert_eq!(
            client.paged(format!("{}/tables", client.dataset_url(&ds)), Some("a+b/c")),
            "http://localhost:9050/bigquery/v2/projects/p/datasets/sales/tables?maxResults=50&pageToken=a%2Bb%2Fc"
        );
        assert_eq!(
            client.table_url(&ds.table("orders")),
            "http://localhost:9050/bigquery/v2/projects/p/datasets/sales/tables/orders"
        );
    }

    #[tokio::test]
    async fn read_json_maps_table_fixture() {
        let resource: TableResource = read_json(mock_response(200, TABLE), "table").await.unwrap();
        assert_eq!(table_metadata(resource).unwrap().columns.len(), 3);
    }
}
