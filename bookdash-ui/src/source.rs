//! Tabular source adapter
//!
//! Fetches one spreadsheet range and turns it into a `Table`. Any failure
//! degrades to an empty table so that one unavailable source never aborts
//! dashboard startup.
//!
//! # API Reference
//! - Endpoint: `GET {base}/{spreadsheet_id}/values/{range}?key={api_key}`
//! - Payload: `{"range": "...", "majorDimension": "ROWS", "values": [[...], ...]}`
//! - `values` is omitted entirely when the range holds no data

use async_trait::async_trait;
use bookdash_common::config::{SourceId, SourcesConfig};
use bookdash_common::{Grid, Table};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Source fetch errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// Server answered with a non-success status
    #[error("HTTP status {status}")]
    Unavailable { status: u16 },

    /// Request never completed
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not a values payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// No URL could be resolved for the source
    #[error("Source not configured: {0}")]
    Unconfigured(String),
}

/// Fetch capability: URL in, raw grid out
#[async_trait]
pub trait TableFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Grid, SourceError>;
}

/// Spreadsheet `values` response body
#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Stringify a JSON cell; the API normally returns formatted strings but
/// unformatted renders use numbers and booleans
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `TableFetcher` backed by the spreadsheet HTTP API
pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bookdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl TableFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Grid, SourceError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable {
                status: status.as_u16(),
            });
        }

        let body: ValuesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.without_url().to_string()))?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }
}

/// In-memory fetcher keyed by URL, for fixtures and offline runs
///
/// Unknown URLs answer with HTTP 404.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    grids: HashMap<String, Grid>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `grid` for `url`
    pub fn with_grid(mut self, url: impl Into<String>, grid: Grid) -> Self {
        self.grids.insert(url.into(), grid);
        self
    }
}

#[async_trait]
impl TableFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Grid, SourceError> {
        self.grids
            .get(url)
            .cloned()
            .ok_or(SourceError::Unavailable { status: 404 })
    }
}

/// Load one source as a table
///
/// Never fails: fetch errors and empty payloads both produce an empty
/// table, with distinct log messages.
pub async fn load(fetcher: &dyn TableFetcher, sources: &SourcesConfig, source: SourceId) -> Table {
    let name = source.table_name();

    let url = match sources.url_for(source) {
        Ok(Some(url)) => url,
        Ok(None) => {
            warn!(source = name, "{}", SourceError::Unconfigured(name.to_string()));
            return Table::empty(name);
        }
        Err(e) => {
            warn!(source = name, error = %e, "Cannot build source URL");
            return Table::empty(name);
        }
    };

    debug!(source = name, range = sources.range(source), "Fetching source");

    match fetcher.fetch(&url).await {
        Ok(grid) if grid.is_empty() => {
            warn!(source = name, "No data found in the sheet");
            Table::empty(name)
        }
        Ok(grid) => match Table::from_grid(name, grid) {
            Ok(table) => {
                info!(
                    source = name,
                    rows = table.len(),
                    columns = table.columns().len(),
                    "Loaded source"
                );
                table
            }
            Err(e) => {
                warn!(source = name, error = %e, "Sheet data does not form a table");
                Table::empty(name)
            }
        },
        Err(SourceError::Unavailable { status }) => {
            warn!(source = name, status, "Failed to fetch data: HTTP status {}", status);
            Table::empty(name)
        }
        Err(e) => {
            warn!(source = name, error = %e, "Failed to fetch data");
            Table::empty(name)
        }
    }
}
