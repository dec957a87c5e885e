//! Overview, dropdown options and author lookup

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use super::SelectionQuery;
use crate::query::{AuthorLookup, Overview};
use crate::AppState;

/// GET /api/overview
///
/// Headline statistics for the summary cards.
pub async fn get_overview(State(state): State<AppState>) -> Json<Overview> {
    Json(state.snapshot().await.overview())
}

#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub titles: Vec<String>,
}

/// GET /api/books
///
/// Dropdown options, one per distinct title.
pub async fn get_books(State(state): State<AppState>) -> Json<BooksResponse> {
    let dashboard = state.snapshot().await;
    Json(BooksResponse {
        titles: dashboard.titles().into_iter().map(str::to_string).collect(),
    })
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    /// not_selected, unknown_title, absent or resolved
    pub status: String,
    pub display: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<AuthorLookup> for AuthorResponse {
    fn from(lookup: AuthorLookup) -> Self {
        let display = lookup.display();
        let (status, first_name, last_name) = match lookup {
            AuthorLookup::NotSelected => ("not_selected", None, None),
            AuthorLookup::UnknownTitle => ("unknown_title", None, None),
            AuthorLookup::Absent => ("absent", None, None),
            AuthorLookup::Resolved {
                first_name,
                last_name,
            } => ("resolved", first_name, last_name),
        };

        Self {
            status: status.to_string(),
            display,
            first_name,
            last_name,
        }
    }
}

/// GET /api/author?book=
pub async fn get_author(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> Json<AuthorResponse> {
    let dashboard = state.snapshot().await;
    Json(dashboard.author_of(query.book.as_deref()).into())
}
