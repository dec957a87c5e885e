//! Chart series endpoints
//!
//! Each endpoint answers with a chart title and its data points. An unknown
//! selected title yields an empty series with `found: false`, never an error.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, SelectionQuery};
use crate::derive::{BookRating, BookSales};
use crate::query::{Dashboard, DisplayMode, Metric, RankedBook, TrendPoint};
use crate::AppState;

/// Query parameters for the per-title bar charts
#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub book: Option<String>,
    /// "all" or "top"; the configured mode when absent
    pub mode: Option<String>,
    /// Length of the "top" variant
    pub n: Option<usize>,
}

/// Query parameters for rankings
#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub n: Option<usize>,
    /// "total_sales" (default) or "average_rating"
    pub metric: Option<String>,
}

/// Chart payload
#[derive(Debug, Serialize)]
pub struct ChartResponse<T> {
    pub title: String,
    pub selected: Option<String>,
    /// False when a title was selected but is not in the dataset
    pub found: bool,
    pub points: Vec<T>,
}

/// Blank means no selection; anything else is kept verbatim
fn selected_title(book: &Option<String>) -> Option<String> {
    book.clone().filter(|s| !s.trim().is_empty())
}

fn found(dashboard: &Dashboard, selected: &Option<String>) -> bool {
    selected.as_deref().map_or(true, |t| dashboard.contains_title(t))
}

fn display_mode(state: &AppState, query: &SeriesQuery) -> Result<DisplayMode, ApiError> {
    let top = query.n.unwrap_or(state.top_n);
    match query.mode.as_deref() {
        None | Some("") => Ok(match state.display_mode {
            DisplayMode::Top(n) => DisplayMode::Top(query.n.unwrap_or(n)),
            DisplayMode::All => DisplayMode::All,
        }),
        Some("all") => Ok(DisplayMode::All),
        Some("top") => Ok(DisplayMode::Top(top)),
        Some(other) => Err(ApiError::InvalidParameter {
            name: "mode",
            value: other.to_string(),
        }),
    }
}

/// GET /api/sales?book=&mode=&n=
///
/// Total sales for the selected book, or for all / the top books.
pub async fn get_sales_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<ChartResponse<BookSales>>, ApiError> {
    let mode = display_mode(&state, &query)?;
    let dashboard = state.snapshot().await;
    let selected = selected_title(&query.book);

    let title = match (&selected, mode) {
        (Some(book), _) => format!("Sales for {}", book),
        (None, DisplayMode::Top(n)) => format!("Top {} Books by Total Sales", n),
        (None, DisplayMode::All) => "Total Sales by Book".to_string(),
    };

    Ok(Json(ChartResponse {
        title,
        found: found(&dashboard, &selected),
        points: dashboard.sales_series(selected.as_deref(), mode),
        selected,
    }))
}

/// GET /api/ratings?book=&mode=&n=
///
/// Average rating for the selected book, or for all / the top books.
pub async fn get_rating_series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<ChartResponse<BookRating>>, ApiError> {
    let mode = display_mode(&state, &query)?;
    let dashboard = state.snapshot().await;
    let selected = selected_title(&query.book);

    let title = match (&selected, mode) {
        (Some(book), _) => format!("Average Rating for {}", book),
        (None, DisplayMode::Top(n)) => format!("Top {} Books by Average Rating", n),
        (None, DisplayMode::All) => "Average Rating by Book".to_string(),
    };

    Ok(Json(ChartResponse {
        title,
        found: found(&dashboard, &selected),
        points: dashboard.rating_series(selected.as_deref(), mode),
        selected,
    }))
}

/// GET /api/trend?book=
///
/// Sales per quarter for the selected book or for all books.
pub async fn get_trend_series(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> Json<ChartResponse<TrendPoint>> {
    let dashboard = state.snapshot().await;
    let selected = selected_title(&query.book);

    let title = match &selected {
        Some(book) => format!("Sales Trend for {}", book),
        None => "Sales Trend by Quarter for All Books".to_string(),
    };

    Json(ChartResponse {
        title,
        found: found(&dashboard, &selected),
        points: dashboard.trend_series(selected.as_deref()),
        selected,
    })
}

/// GET /api/top?n=&metric=
///
/// Ranked books, rank 1 = highest value.
pub async fn get_top_books(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<ChartResponse<RankedBook>>, ApiError> {
    let metric = match query.metric.as_deref() {
        None | Some("") | Some("total_sales") => Metric::TotalSales,
        Some("average_rating") => Metric::AverageRating,
        Some(other) => {
            return Err(ApiError::InvalidParameter {
                name: "metric",
                value: other.to_string(),
            })
        }
    };
    let n = query.n.unwrap_or(state.top_n);
    let dashboard = state.snapshot().await;

    let title = match metric {
        Metric::TotalSales => format!("Top {} Selling Books", n),
        Metric::AverageRating => format!("Top {} Books by Average Rating", n),
    };

    Ok(Json(ChartResponse {
        title,
        selected: None,
        found: true,
        points: dashboard.top_n(n, metric),
    }))
}
