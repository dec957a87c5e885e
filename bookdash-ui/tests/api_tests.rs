//! Integration tests for bookdash-ui API endpoints
//!
//! Every test runs against an in-memory spreadsheet served by
//! `StaticFetcher`, so no network access is needed.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bookdash_common::config::{DashboardConfig, SourceId, SourcesConfig};
use bookdash_common::{Grid, Quarter};
use bookdash_ui::dataset::Loader;
use bookdash_ui::query::Dashboard;
use bookdash_ui::source::StaticFetcher;
use bookdash_ui::{build_router, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

fn grid(rows: &[&[&str]]) -> Grid {
    rows.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}

fn test_sources() -> SourcesConfig {
    SourcesConfig {
        sheets_base_url: "http://sheets.test/v4/spreadsheets".to_string(),
        spreadsheet_id: Some("bookshop".to_string()),
        ..SourcesConfig::default()
    }
}

/// Test helper: three titles over two quarters
///
/// Alpha sells 3 (Ann Lee), Beta sells 1 (Bo Kim), Gamma sells 1 and has
/// no author row. One Q1 sale carries an unknown ISBN and is dropped.
fn test_fetcher(sources: &SourcesConfig) -> StaticFetcher {
    let url = |id: SourceId| {
        sources
            .url_for(id)
            .unwrap()
            .expect("spreadsheet is configured")
    };

    StaticFetcher::new()
        .with_grid(
            url(SourceId::Books),
            grid(&[
                &["BookID", "Title", "AuthID"],
                &["1", "Alpha", "10"],
                &["2", "Beta", "11"],
                &["3", "Gamma", "99"],
            ]),
        )
        .with_grid(
            url(SourceId::Editions),
            grid(&[&["ISBN", "BookID"], &["X1", "1"], &["Y1", "2"], &["Z1", "3"]]),
        )
        .with_grid(
            url(SourceId::Authors),
            grid(&[
                &["AuthID", "First Name", "Last Name"],
                &["10", "Ann", "Lee"],
                &["11", "Bo", "Kim"],
            ]),
        )
        .with_grid(
            url(SourceId::Sales(Quarter::Q1)),
            grid(&[
                &["OrderID", "ISBN"],
                &["1", "X1"],
                &["2", "X1"],
                &["3", "Y1"],
                &["4", "UNKNOWN"],
            ]),
        )
        .with_grid(
            url(SourceId::Sales(Quarter::Q2)),
            grid(&[&["OrderID", "ISBN"], &["5", "X1"], &["6", "Z1"]]),
        )
}

fn test_loader() -> Loader {
    let sources = test_sources();
    let fetcher = test_fetcher(&sources);
    Loader::new(Arc::new(fetcher), sources, Some(7))
}

/// Test helper: Create app with the fixture snapshot already built
async fn setup_app() -> axum::Router {
    let loader = test_loader();
    let dashboard = loader.build().await.unwrap();
    let state = AppState::new(dashboard, loader, &DashboardConfig::default());
    build_router(state)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn get_json(app: axum::Router, uri: &str) -> Value {
    let response = app.oneshot(test_request("GET", uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK, "GET {}", uri);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health and UI
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let body = get_json(setup_app().await, "/health").await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bookdash-ui");
    assert!(body["version"].is_string());
    assert!(body["loaded_at"].is_string());
}

#[tokio::test]
async fn test_index_served() {
    let app = setup_app().await;
    let response = app.oneshot(test_request("GET", "/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("book-dropdown"));
    assert!(html.contains("/static/app.js"));
}

#[tokio::test]
async fn test_app_js_served() {
    let app = setup_app().await;
    let response = app
        .oneshot(test_request("GET", "/static/app.js"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/javascript"
    );
}

// =============================================================================
// Overview and catalog
// =============================================================================

#[tokio::test]
async fn test_overview_counts() {
    let body = get_json(setup_app().await, "/api/overview").await;

    // The sale with an unknown ISBN is dropped by the inner join
    assert_eq!(body["merged_records"], 5);
    assert_eq!(body["total_sales"], 5);
    assert_eq!(body["unique_titles"], 3);
}

#[tokio::test]
async fn test_books_lists_each_title_once() {
    let body = get_json(setup_app().await, "/api/books").await;

    let titles: Vec<&str> = body["titles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
}

#[tokio::test]
async fn test_author_statuses() {
    let app = setup_app().await;

    let body = get_json(app.clone(), "/api/author").await;
    assert_eq!(body["status"], "not_selected");
    assert_eq!(body["display"], "No book selected.");

    let body = get_json(app.clone(), "/api/author?book=Alpha").await;
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["display"], "Ann Lee");
    assert_eq!(body["first_name"], "Ann");

    let body = get_json(app.clone(), "/api/author?book=Gamma").await;
    assert_eq!(body["status"], "absent");
    assert_eq!(body["display"], "Unknown author");

    let body = get_json(app, "/api/author?book=Nonexistent").await;
    assert_eq!(body["status"], "unknown_title");
    assert_eq!(body["display"], "Book not found.");
}

// =============================================================================
// Chart series
// =============================================================================

#[tokio::test]
async fn test_sales_for_selected_book() {
    let body = get_json(setup_app().await, "/api/sales?book=Alpha").await;

    assert_eq!(body["title"], "Sales for Alpha");
    assert_eq!(body["selected"], "Alpha");
    assert_eq!(body["found"], true);
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["title"], "Alpha");
    assert_eq!(points[0]["total_sales"], 3);
}

#[tokio::test]
async fn test_sales_for_unknown_book_is_empty() {
    let body = get_json(setup_app().await, "/api/sales?book=Nonexistent").await;

    assert_eq!(body["found"], false);
    assert!(body["points"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_padded_title_selected_verbatim() {
    let sources = test_sources();
    let url = |id: SourceId| sources.url_for(id).unwrap().unwrap();
    let fetcher = StaticFetcher::new()
        .with_grid(
            url(SourceId::Books),
            grid(&[&["BookID", "Title"], &["1", "Dune "]]),
        )
        .with_grid(url(SourceId::Editions), grid(&[&["ISBN", "BookID"], &["D1", "1"]]))
        .with_grid(
            url(SourceId::Sales(Quarter::Q1)),
            grid(&[&["OrderID", "ISBN"], &["1", "D1"]]),
        );
    let loader = Loader::new(Arc::new(fetcher), sources.clone(), Some(3));
    let dashboard = loader.build().await.unwrap();
    let app = build_router(AppState::new(dashboard, loader, &DashboardConfig::default()));

    let body = get_json(app.clone(), "/api/sales?book=Dune%20").await;
    assert_eq!(body["found"], true);
    assert_eq!(body["points"][0]["total_sales"], 1);

    let body = get_json(app, "/api/sales?book=Dune").await;
    assert_eq!(body["found"], false);
}

#[tokio::test]
async fn test_sales_top_mode() {
    let body = get_json(setup_app().await, "/api/sales?mode=top&n=2").await;

    assert_eq!(body["title"], "Top 2 Books by Total Sales");
    assert!(body["selected"].is_null());
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["title"], "Alpha");
    // Beta and Gamma tie; first appearance wins
    assert_eq!(points[1]["title"], "Beta");
}

#[tokio::test]
async fn test_sales_all_mode_keeps_summary_order() {
    let body = get_json(setup_app().await, "/api/sales?mode=all").await;

    assert_eq!(body["title"], "Total Sales by Book");
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    let sum: u64 = points.iter().map(|p| p["total_sales"].as_u64().unwrap()).sum();
    assert_eq!(sum, 5);
}

#[tokio::test]
async fn test_sales_invalid_mode_rejected() {
    let app = setup_app().await;
    let response = app
        .oneshot(test_request("GET", "/api/sales?mode=sideways"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Invalid mode: sideways");
}

#[tokio::test]
async fn test_synthetic_ratings_in_range() {
    let body = get_json(setup_app().await, "/api/ratings?mode=all").await;

    assert_eq!(body["title"], "Average Rating by Book");
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    for point in points {
        let rating = point["average_rating"].as_f64().unwrap();
        assert!((1.0..=5.0).contains(&rating), "rating {} out of range", rating);
    }
}

#[tokio::test]
async fn test_trend_all_books() {
    let body = get_json(setup_app().await, "/api/trend").await;

    assert_eq!(body["title"], "Sales Trend by Quarter for All Books");
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["quarter"], "Q1");
    assert_eq!(points[0]["total_sales"], 3);
    assert_eq!(points[1]["quarter"], "Q2");
    assert_eq!(points[1]["total_sales"], 2);
}

#[tokio::test]
async fn test_trend_selected_book() {
    let body = get_json(setup_app().await, "/api/trend?book=Gamma").await;

    assert_eq!(body["title"], "Sales Trend for Gamma");
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["quarter"], "Q2");
    assert_eq!(points[0]["total_sales"], 1);
}

#[tokio::test]
async fn test_top_books_ranked() {
    let body = get_json(setup_app().await, "/api/top?n=10").await;

    assert_eq!(body["title"], "Top 10 Selling Books");
    let points = body["points"].as_array().unwrap();
    // Fewer titles than requested
    assert_eq!(points.len(), 3);
    assert_eq!(points[0]["rank"], 1);
    assert_eq!(points[0]["title"], "Alpha");
    assert_eq!(points[0]["value"], 3.0);
    assert_eq!(points[2]["rank"], 3);
}

#[tokio::test]
async fn test_top_books_invalid_metric_rejected() {
    let app = setup_app().await;
    let response = app
        .oneshot(test_request("GET", "/api/top?metric=price"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Invalid metric: price");
}

// =============================================================================
// Reload
// =============================================================================

#[tokio::test]
async fn test_reload_swaps_snapshot() {
    let loader = test_loader();
    let state = AppState::new(Dashboard::new(Vec::new()).unwrap(), loader, &DashboardConfig::default());
    let app = build_router(state.clone());

    let before = get_json(app.clone(), "/api/overview").await;
    assert_eq!(before["merged_records"], 0);

    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/reload"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["merged_records"], 5);

    let after = get_json(app, "/api/overview").await;
    assert_eq!(after["merged_records"], 5);
    assert_eq!(state.snapshot().await.records().len(), 5);
}

#[tokio::test]
async fn test_unconfigured_sources_serve_empty_dashboard() {
    let sources = SourcesConfig::default();
    let loader = Loader::new(Arc::new(StaticFetcher::new()), sources, Some(1));
    let dashboard = loader.build().await.unwrap();
    let app = build_router(AppState::new(dashboard, loader, &DashboardConfig::default()));

    let overview = get_json(app.clone(), "/api/overview").await;
    assert_eq!(overview["merged_records"], 0);
    assert_eq!(overview["total_sales"], 0);

    let trend = get_json(app, "/api/trend").await;
    assert!(trend["points"].as_array().unwrap().is_empty());
}
