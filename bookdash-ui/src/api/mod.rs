//! HTTP API handlers for bookdash-ui

pub mod catalog;
pub mod charts;
pub mod error;
pub mod health;
pub mod reload;
pub mod ui;

pub use catalog::{get_author, get_books, get_overview};
pub use charts::{get_rating_series, get_sales_series, get_top_books, get_trend_series};
pub use error::ApiError;
pub use health::health_routes;
pub use reload::reload;
pub use ui::{serve_app_js, serve_index};

use serde::Deserialize;

/// Query parameters shared by the per-title endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    /// Selected book title; absent or empty means "all books"
    pub book: Option<String>,
}
