//! Common error types for bookdash

use thiserror::Error;

/// Common result type for bookdash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across bookdash crates
#[derive(Error, Debug)]
pub enum Error {
    /// TOML configuration could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Value could not be parsed into the expected type
    #[error("Parse error: {0}")]
    Parse(String),

    /// Frame operation failed
    #[error("Table error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
