//! Configuration loading and source resolution
//!
//! Bootstrap configuration comes from a TOML file located in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BOOKDASH_CONFIG` environment variable
//! 3. User config directory (`<config_dir>/bookdash/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing file at the user config location is not an error; the
//! dashboard starts with defaults and every source degrades to an empty
//! table until a spreadsheet is configured.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::{Error, Quarter, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BOOKDASH_CONFIG";

/// Environment override for `sources.spreadsheet_id`
pub const SPREADSHEET_ID_ENV_VAR: &str = "BOOKDASH_SPREADSHEET_ID";

/// Environment override for `sources.api_key`
pub const API_KEY_ENV_VAR: &str = "BOOKDASH_API_KEY";

/// Default HTTP port for the dashboard
pub const DEFAULT_PORT: u16 = 8056;

/// Complete bootstrap configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug mode raises the default log level to `debug`
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Spreadsheet source configuration
///
/// Each source is one range of one spreadsheet, fetched through the
/// `values` endpoint: `{base}/{spreadsheet_id}/values/{range}?key={api_key}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_sheets_base_url")]
    pub sheets_base_url: String,

    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_book_range")]
    pub book_range: String,

    #[serde(default = "default_edition_range")]
    pub edition_range: String,

    #[serde(default = "default_author_range")]
    pub author_range: String,

    #[serde(default = "default_sales_q1_range")]
    pub sales_q1_range: String,

    #[serde(default = "default_sales_q2_range")]
    pub sales_q2_range: String,

    #[serde(default = "default_sales_q3_range")]
    pub sales_q3_range: String,

    #[serde(default = "default_sales_q4_range")]
    pub sales_q4_range: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sheets_base_url: default_sheets_base_url(),
            spreadsheet_id: None,
            api_key: None,
            book_range: default_book_range(),
            edition_range: default_edition_range(),
            author_range: default_author_range(),
            sales_q1_range: default_sales_q1_range(),
            sales_q2_range: default_sales_q2_range(),
            sales_q3_range: default_sales_q3_range(),
            sales_q4_range: default_sales_q4_range(),
        }
    }
}

/// How chart series are shown when no title is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesMode {
    /// Every title
    All,
    /// The `top_n` highest titles
    Top,
}

/// Dashboard behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_series_mode")]
    pub series_mode: SeriesMode,

    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Seed for synthetic ratings; entropy-seeded when unset
    #[serde(default)]
    pub rating_seed: Option<u64>,

    /// Periodic rebuild interval; no periodic refresh when unset
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            series_mode: default_series_mode(),
            top_n: default_top_n(),
            rating_seed: None,
            refresh_interval_secs: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sheets_base_url() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}

fn default_book_range() -> String {
    "Book!A1:C59".to_string()
}

fn default_edition_range() -> String {
    "Edition!A1:H96".to_string()
}

fn default_author_range() -> String {
    "Author!A1:F42".to_string()
}

fn default_sales_q1_range() -> String {
    "Sales Q1!A1:E7786".to_string()
}

fn default_sales_q2_range() -> String {
    "Sales Q2!A1:E13355".to_string()
}

fn default_sales_q3_range() -> String {
    "Sales Q3!A1:E22119".to_string()
}

fn default_sales_q4_range() -> String {
    "Sales Q4!A1:E13094".to_string()
}

fn default_series_mode() -> SeriesMode {
    SeriesMode::Top
}

fn default_top_n() -> usize {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

/// Identifier of one tabular source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Books,
    Editions,
    Authors,
    Sales(Quarter),
}

impl SourceId {
    /// Every source the dashboard loads
    pub const ALL: [SourceId; 7] = [
        SourceId::Books,
        SourceId::Editions,
        SourceId::Authors,
        SourceId::Sales(Quarter::Q1),
        SourceId::Sales(Quarter::Q2),
        SourceId::Sales(Quarter::Q3),
        SourceId::Sales(Quarter::Q4),
    ];

    /// Table name, also used as the join collision suffix
    pub fn table_name(self) -> &'static str {
        match self {
            SourceId::Books => "book",
            SourceId::Editions => "edition",
            SourceId::Authors => "author",
            SourceId::Sales(Quarter::Q1) => "sales_q1",
            SourceId::Sales(Quarter::Q2) => "sales_q2",
            SourceId::Sales(Quarter::Q3) => "sales_q3",
            SourceId::Sales(Quarter::Q4) => "sales_q4",
        }
    }
}

impl SourcesConfig {
    /// Sheet range for a source
    pub fn range(&self, source: SourceId) -> &str {
        match source {
            SourceId::Books => &self.book_range,
            SourceId::Editions => &self.edition_range,
            SourceId::Authors => &self.author_range,
            SourceId::Sales(Quarter::Q1) => &self.sales_q1_range,
            SourceId::Sales(Quarter::Q2) => &self.sales_q2_range,
            SourceId::Sales(Quarter::Q3) => &self.sales_q3_range,
            SourceId::Sales(Quarter::Q4) => &self.sales_q4_range,
        }
    }

    /// Fetch URL for a source, `None` when no spreadsheet is configured
    ///
    /// The spreadsheet id and range are appended as percent-encoded path
    /// segments and the API key as a `key` query parameter.
    ///
    /// # Errors
    ///
    /// Returns error if `sheets_base_url` is not an absolute base URL.
    pub fn url_for(&self, source: SourceId) -> Result<Option<String>> {
        let Some(spreadsheet_id) = self.spreadsheet_id.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let mut url = Url::parse(&self.sheets_base_url).map_err(|e| {
            Error::Config(format!("Invalid sheets_base_url {}: {}", self.sheets_base_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("sheets_base_url cannot be a base: {}", self.sheets_base_url)))?
            .pop_if_empty()
            .extend([spreadsheet_id, "values", self.range(source)]);

        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("key", key);
        }

        Ok(Some(url.into()))
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfig(PathBuf),
    CompiledDefaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::UserConfig(p) => Some(p),
            ConfigSource::CompiledDefaults => None,
        }
    }
}

/// Resolves which config file to read
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Apply the priority order; the user config location only counts if
    /// the file exists
    pub fn resolve(&self) -> ConfigSource {
        if let Some(path) = &self.cli_path {
            return ConfigSource::CommandLine(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        if let Some(path) = user_config_path() {
            if path.exists() {
                return ConfigSource::UserConfig(path);
            }
        }

        ConfigSource::CompiledDefaults
    }

    /// Resolve, read and parse the configuration, then apply environment
    /// overrides
    ///
    /// # Errors
    ///
    /// Returns error if an explicitly named file (CLI or environment) cannot
    /// be read, or if any resolved file is not valid TOML.
    pub fn load(&self) -> Result<(TomlConfig, ConfigSource)> {
        let source = self.resolve();

        let mut config = match source.path() {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
                })?;
                let config = TomlConfig::from_toml_str(&content)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                debug!("No configuration file found, using compiled defaults");
                TomlConfig::default()
            }
        };

        config.apply_env_overrides();

        Ok((config, source))
    }
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Environment variables take precedence over file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var(SPREADSHEET_ID_ENV_VAR) {
            if !id.is_empty() {
                self.sources.spreadsheet_id = Some(id);
            }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
            if !key.is_empty() {
                self.sources.api_key = Some(key);
            }
        }
    }
}

/// Default per-user config file location
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bookdash").join("config.toml"))
}
