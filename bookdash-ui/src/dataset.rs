//! Load-and-merge pipeline
//!
//! Fixed join order:
//! 1. `Sales ⋈(ISBN, inner) Edition`
//! 2. `⋈(BookID, inner) Book`
//! 3. `⋈(AuthID, left) Author`
//!
//! Changing the order changes which mismatched rows are dropped.

use bookdash_common::config::{SourceId, SourcesConfig};
use bookdash_common::{Quarter, Result, Table};
use std::sync::Arc;
use tracing::info;

use crate::derive::{derive_rating, derive_total_sales, project_records, RandomRatings, RatingSource};
use crate::join::{join, JoinMode};
use crate::query::Dashboard;
use crate::schema;
use crate::source::{load, TableFetcher};

/// Every source table, as loaded
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub books: Table,
    pub editions: Table,
    pub authors: Table,
    /// Quarterly sales, untagged
    pub sales: Vec<(Quarter, Table)>,
}

impl SourceTables {
    /// Fetch every source sequentially; failures yield empty tables
    pub async fn load(fetcher: &dyn TableFetcher, sources: &SourcesConfig) -> Self {
        let mut tables = SourceTables {
            books: load(fetcher, sources, SourceId::Books).await,
            editions: load(fetcher, sources, SourceId::Editions).await,
            authors: load(fetcher, sources, SourceId::Authors).await,
            sales: Vec::with_capacity(Quarter::ALL.len()),
        };

        for quarter in Quarter::ALL {
            let table = load(fetcher, sources, SourceId::Sales(quarter)).await;
            tables.sales.push((quarter, table));
        }

        tables
    }

    /// All quarterly sales as one table, each record tagged with its quarter
    pub fn sales_table(&self) -> Result<Table> {
        let tagged = self
            .sales
            .iter()
            .map(|(quarter, table)| table.clone().with_constant_column(schema::QUARTER, quarter.label()))
            .collect::<Result<Vec<Table>>>()?;

        Table::concat("sales", &tagged)
    }

    /// Run the fixed join sequence
    pub fn merge(&self) -> Result<Table> {
        let sales = self.sales_table()?;
        let merged = join(&sales, &self.editions, schema::ISBN, JoinMode::Inner)?;
        let merged = join(&merged, &self.books, schema::BOOK_ID, JoinMode::Inner)?;
        let merged = join(&merged, &self.authors, schema::AUTH_ID, JoinMode::Left)?;

        info!(
            sales = sales.len(),
            merged = merged.len(),
            dropped = sales.len().saturating_sub(merged.len()),
            "Merged sales with editions, books and authors"
        );

        Ok(merged)
    }
}

/// Merge, derive and summarise into a fresh dashboard snapshot
pub fn build_dashboard(tables: &SourceTables, ratings: &mut dyn RatingSource) -> Result<Dashboard> {
    let merged = derive_total_sales(derive_rating(tables.merge()?, ratings)?)?;
    let records = project_records(&merged)?;
    let dashboard = Dashboard::new(records)?;

    let overview = dashboard.overview();
    info!(
        records = overview.merged_records,
        titles = overview.unique_titles,
        total_sales = overview.total_sales,
        "Dashboard snapshot built"
    );

    Ok(dashboard)
}

/// Rebuilds snapshots from the configured sources
pub struct Loader {
    fetcher: Arc<dyn TableFetcher>,
    sources: SourcesConfig,
    rating_seed: Option<u64>,
}

impl Loader {
    pub fn new(fetcher: Arc<dyn TableFetcher>, sources: SourcesConfig, rating_seed: Option<u64>) -> Self {
        Self {
            fetcher,
            sources,
            rating_seed,
        }
    }

    /// Fetch every source and build a complete new snapshot
    ///
    /// Source failures degrade to empty tables; only a frame-level failure
    /// while merging is an error.
    pub async fn build(&self) -> Result<Dashboard> {
        let tables = SourceTables::load(self.fetcher.as_ref(), &self.sources).await;
        let mut ratings = match self.rating_seed {
            Some(seed) => RandomRatings::seeded(seed),
            None => RandomRatings::from_entropy(),
        };
        build_dashboard(&tables, &mut ratings)
    }
}
