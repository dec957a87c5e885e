//! # Bookdash Common Library
//!
//! Shared code for the bookshop dashboard including:
//! - Error types
//! - Configuration loading (TOML, environment, compiled defaults)
//! - Sales quarter labels and source identifiers
//! - The `Table` model: named polars frames built from spreadsheet grids

pub mod config;
pub mod error;
pub mod quarter;
pub mod table;

pub use error::{Error, Result};
pub use quarter::Quarter;
pub use table::{Grid, Table};
