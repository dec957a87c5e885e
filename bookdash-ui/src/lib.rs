//! bookdash-ui library - Bookshop sales dashboard
//!
//! Loads books, editions, authors and quarterly sales from a spreadsheet,
//! joins them into one merged record set and serves chart series over HTTP.

use axum::Router;
use bookdash_common::config::DashboardConfig;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod api;
pub mod dataset;
pub mod derive;
pub mod join;
pub mod query;
pub mod schema;
pub mod source;

use dataset::Loader;
use query::{Dashboard, DisplayMode};

/// Application state shared across HTTP handlers
///
/// Handlers read the current snapshot as an `Arc<Dashboard>` and never hold
/// the lock while querying. A reload builds a complete new snapshot before
/// swapping the pointer; the live snapshot is never mutated.
#[derive(Clone)]
pub struct AppState {
    snapshot: Arc<RwLock<Arc<Dashboard>>>,
    loader: Arc<Loader>,
    reload_lock: Arc<Mutex<()>>,
    /// Series shape when no title is selected
    pub display_mode: DisplayMode,
    /// Ranking length when a request does not name one
    pub top_n: usize,
}

impl AppState {
    /// Create new application state around an initial snapshot
    pub fn new(dashboard: Dashboard, loader: Loader, config: &DashboardConfig) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(dashboard))),
            loader: Arc::new(loader),
            reload_lock: Arc::new(Mutex::new(())),
            display_mode: DisplayMode::from_config(config),
            top_n: config.top_n,
        }
    }

    /// Current immutable snapshot
    pub async fn snapshot(&self) -> Arc<Dashboard> {
        self.snapshot.read().await.clone()
    }

    /// Rebuild from source and swap the snapshot
    ///
    /// Concurrent calls are serialised; readers keep the previous snapshot
    /// until the swap. A failed build leaves the previous snapshot live.
    pub async fn reload(&self) -> bookdash_common::Result<Arc<Dashboard>> {
        let _guard = self.reload_lock.lock().await;

        let fresh = match self.loader.build().await {
            Ok(dashboard) => Arc::new(dashboard),
            Err(e) => {
                warn!("Reload failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };
        *self.snapshot.write().await = fresh.clone();

        info!(records = fresh.records().len(), "Dashboard snapshot swapped");
        Ok(fresh)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/overview", get(api::get_overview))
        .route("/api/books", get(api::get_books))
        .route("/api/sales", get(api::get_sales_series))
        .route("/api/ratings", get(api::get_rating_series))
        .route("/api/trend", get(api::get_trend_series))
        .route("/api/top", get(api::get_top_books))
        .route("/api/author", get(api::get_author))
        .route("/api/reload", post(api::reload));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes());

    Router::new()
        .merge(api)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
