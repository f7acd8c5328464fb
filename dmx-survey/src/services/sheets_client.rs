//! Spreadsheet log client
//!
//! Appends rows to a Google-Sheets-compatible spreadsheet. The spreadsheet is
//! addressed by name; the name is resolved to an id once through the Drive
//! files search and cached for the process lifetime.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::OnceCell;

use dmx_common::config::{ServiceCredentials, SheetsConfig};

const USER_AGENT: &str = concat!("dmx-survey/", env!("CARGO_PKG_VERSION"));
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// External log errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SheetsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Invalid endpoint: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Logical tables in the durable log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTable {
    /// Raw view events
    Events,
    /// One row per finalized exhibition
    Summary,
}

/// Append-only durable log
#[async_trait]
pub trait ExternalLog: Send + Sync {
    /// Append rows, returning how many rows the service reports written
    async fn append_rows(&self, table: LogTable, rows: Vec<Vec<String>>) -> Result<usize, SheetsError>;
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_rows: Option<usize>,
}

/// Sheets API client authenticated with a bearer credential
pub struct SheetsClient {
    http_client: reqwest::Client,
    config: SheetsConfig,
    credentials: ServiceCredentials,
    spreadsheet_id: OnceCell<String>,
}

impl SheetsClient {
    pub fn new(
        config: SheetsConfig,
        credentials: ServiceCredentials,
        timeout: Duration,
    ) -> Result<Self, SheetsError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        let spreadsheet_id = match &config.spreadsheet_id {
            Some(id) => OnceCell::new_with(Some(id.clone())),
            None => OnceCell::new(),
        };

        Ok(Self {
            http_client,
            config,
            credentials,
            spreadsheet_id,
        })
    }

    fn range_for(&self, table: LogTable) -> &str {
        match table {
            LogTable::Events => &self.config.events_range,
            LogTable::Summary => &self.config.summary_range,
        }
    }

    fn endpoint(base: &str, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = Url::parse(base).map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Spreadsheet id, resolved by name on first use
    async fn spreadsheet_id(&self) -> Result<&str, SheetsError> {
        let id = self
            .spreadsheet_id
            .get_or_try_init(|| self.lookup_spreadsheet_id())
            .await?;
        Ok(id.as_str())
    }

    async fn lookup_spreadsheet_id(&self) -> Result<String, SheetsError> {
        let name = &self.config.spreadsheet_name;
        let url = Self::endpoint(&self.config.drive_base, &["drive", "v3", "files"])?;
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            name.replace('\'', "\\'"),
            SPREADSHEET_MIME
        );

        tracing::debug!(spreadsheet = %name, "Resolving spreadsheet id by name");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.credentials.access_token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)"), ("pageSize", "1")])
            .send()
            .await
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(status.as_u16(), error_text));
        }

        let list: DriveFileList = response
            .json()
            .await
            .map_err(|e| SheetsError::Parse(e.to_string()))?;

        let id = list
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(name.clone()))?;

        tracing::info!(spreadsheet = %name, spreadsheet_id = %id, "Resolved spreadsheet");
        Ok(id)
    }
}

#[async_trait]
impl ExternalLog for SheetsClient {
    async fn append_rows(&self, table: LogTable, rows: Vec<Vec<String>>) -> Result<usize, SheetsError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let spreadsheet_id = self.spreadsheet_id().await?;
        let range = self.range_for(table);
        let append_segment = format!("{}:append", range);
        let url = Self::endpoint(
            &self.config.api_base,
            &["v4", "spreadsheets", spreadsheet_id, "values", &append_segment],
        )?;

        let row_count = rows.len();
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.credentials.access_token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": rows }))
            .send()
            .await
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(status.as_u16(), error_text));
        }

        let body: AppendResponse = response
            .json()
            .await
            .map_err(|e| SheetsError::Parse(e.to_string()))?;
        let written = body
            .updates
            .and_then(|u| u.updated_rows)
            .unwrap_or(row_count);

        tracing::info!(
            spreadsheet_id = %spreadsheet_id,
            range = %range,
            rows = written,
            "Appended rows to external log"
        );
        Ok(written)
    }
}
