//! Derived columns, typed merged records, and per-title summaries

use bookdash_common::config::SourceId;
use bookdash_common::{Quarter, Result, Table};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::join::matched_records;
use crate::schema;

/// Lowest synthetic rating (inclusive)
pub const RATING_MIN: u8 = 1;

/// Highest synthetic rating (inclusive)
pub const RATING_MAX: u8 = 5;

/// Source of synthetic ratings
pub trait RatingSource {
    /// Next rating in `RATING_MIN..=RATING_MAX`
    fn next_rating(&mut self) -> u8;
}

/// Uniform random ratings
pub struct RandomRatings<R> {
    rng: R,
}

impl RandomRatings<StdRng> {
    /// Reproducible sequence
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> RatingSource for RandomRatings<R> {
    fn next_rating(&mut self) -> u8 {
        self.rng.gen_range(RATING_MIN..=RATING_MAX)
    }
}

/// Same rating for every record
#[derive(Debug, Clone, Copy)]
pub struct FixedRating(pub u8);

impl RatingSource for FixedRating {
    fn next_rating(&mut self) -> u8 {
        self.0.clamp(RATING_MIN, RATING_MAX)
    }
}

/// True if any record carries a numeric `Rating`
pub fn has_ratings(table: &Table) -> Result<bool> {
    Ok(table
        .number_values(schema::RATING)?
        .map_or(false, |values| values.iter().any(Option::is_some)))
}

/// Assign synthetic ratings when the data carries none
///
/// Table-wide: either no record is touched or every record gets an
/// independently drawn rating.
pub fn derive_rating(table: Table, ratings: &mut dyn RatingSource) -> Result<Table> {
    if has_ratings(&table)? {
        debug!("Source data supplies ratings; no synthetic fallback");
        return Ok(table);
    }
    if table.frame().width() == 0 {
        return Ok(table);
    }

    info!(
        records = table.len(),
        min = RATING_MIN,
        max = RATING_MAX,
        "No ratings in source data, assigning synthetic ratings"
    );

    let draws: Vec<f64> = (0..table.len())
        .map(|_| f64::from(ratings.next_rating()))
        .collect();
    let name = table.name().to_string();
    let mut frame = table.into_frame();
    frame.with_column(Column::new(schema::RATING.into(), draws))?;
    Ok(Table::from_frame(name, frame))
}

/// Stamp every record with the number of records sharing its title
///
/// Window transform: the table keeps one row per record. Records without a
/// title get null.
pub fn derive_total_sales(table: Table) -> Result<Table> {
    if table.frame().width() == 0 {
        return Ok(table);
    }

    let total_sales = if table.has_column(schema::TITLE) {
        when(col(schema::TITLE).is_null())
            .then(lit(NULL).cast(DataType::UInt64))
            .otherwise(len().over([col(schema::TITLE)]).cast(DataType::UInt64))
    } else {
        lit(NULL).cast(DataType::UInt64)
    };

    let frame = table
        .lazy()
        .with_column(total_sales.alias(schema::TOTAL_SALES))
        .collect()?;
    Ok(Table::from_frame(table.name(), frame))
}

/// Author fields of a merged record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthorField {
    /// Matched an author row; individual names may still be blank
    Resolved {
        first_name: Option<String>,
        last_name: Option<String>,
    },
    /// No author row matched the record's `AuthID`
    Absent,
}

/// One sale joined with its edition, book and author
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub order_id: Option<String>,
    pub isbn: String,
    pub book_id: String,
    pub title: String,
    pub quarter: Quarter,
    pub author: AuthorField,
    pub rating: Option<f64>,
    pub total_sales: u64,
}

/// Text column, or all-null when the table lacks it
fn texts(table: &Table, column: &str) -> Result<Vec<Option<String>>> {
    Ok(table
        .text_values(column)?
        .unwrap_or_else(|| vec![None; table.len()]))
}

fn numbers(table: &Table, column: &str) -> Result<Vec<Option<f64>>> {
    Ok(table
        .number_values(column)?
        .unwrap_or_else(|| vec![None; table.len()]))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Typed view of the derived merged table
///
/// Records without a title or a valid quarter tag are skipped. Author names
/// count as absent when the author left join found no match, or when the
/// table carries no author columns at all.
pub fn project_records(table: &Table) -> Result<Vec<MergedRecord>> {
    let mut titles = texts(table, schema::TITLE)?;
    let mut quarters = texts(table, schema::QUARTER)?;
    let mut order_ids = texts(table, schema::ORDER_ID)?;
    let mut isbns = texts(table, schema::ISBN)?;
    let mut book_ids = texts(table, schema::BOOK_ID)?;
    let mut first_names = texts(table, schema::FIRST_NAME)?;
    let mut last_names = texts(table, schema::LAST_NAME)?;
    let ratings = numbers(table, schema::RATING)?;
    let total_sales = numbers(table, schema::TOTAL_SALES)?;

    let has_author_columns = table.has_column(schema::FIRST_NAME) || table.has_column(schema::LAST_NAME);
    let author_matched = matched_records(table, SourceId::Authors.table_name())?
        .unwrap_or_else(|| vec![has_author_columns; table.len()]);

    let mut records = Vec::with_capacity(table.len());
    let mut skipped = 0usize;

    for i in 0..table.len() {
        let title = non_empty(titles[i].take());
        let quarter = quarters[i].take().and_then(|q| q.parse::<Quarter>().ok());
        let (Some(title), Some(quarter)) = (title, quarter) else {
            skipped += 1;
            continue;
        };

        let author = if author_matched[i] {
            AuthorField::Resolved {
                first_name: non_empty(first_names[i].take()),
                last_name: non_empty(last_names[i].take()),
            }
        } else {
            AuthorField::Absent
        };

        records.push(MergedRecord {
            order_id: order_ids[i].take(),
            isbn: isbns[i].take().unwrap_or_default(),
            book_id: book_ids[i].take().unwrap_or_default(),
            title,
            quarter,
            author,
            rating: ratings[i],
            total_sales: total_sales[i].map_or(0, |n| n as u64),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Merged records without title or quarter were skipped");
    }

    Ok(records)
}

/// Total sales for one title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookSales {
    pub title: String,
    pub total_sales: u64,
}

/// Mean rating for one title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookRating {
    pub title: String,
    pub average_rating: Option<f64>,
}

/// Per-title aggregates, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summaries {
    pub book_sales: Vec<BookSales>,
    pub book_ratings: Vec<BookRating>,
}

/// Group records by title
///
/// Each record contributes exactly one sale to its title, so the per-title
/// total equals the window count stamped on every record of that title.
/// Groups keep first-appearance order; unrated records are left out of the
/// mean.
pub fn summarize(records: &[MergedRecord]) -> Result<Summaries> {
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    let ratings: Vec<Option<f64>> = records.iter().map(|r| r.rating).collect();

    let grouped = df!(
        schema::TITLE => titles,
        schema::RATING => ratings
    )?
    .lazy()
    .group_by_stable([col(schema::TITLE)])
    .agg([
        len().alias(schema::TOTAL_SALES),
        col(schema::RATING).mean().alias(schema::RATING),
    ])
    .collect()?;
    let grouped = Table::from_frame("summary", grouped);

    let titles = texts(&grouped, schema::TITLE)?;
    let counts = numbers(&grouped, schema::TOTAL_SALES)?;
    let means = numbers(&grouped, schema::RATING)?;

    let mut summaries = Summaries::default();
    for ((title, count), mean) in titles.into_iter().zip(counts).zip(means) {
        let title = title.unwrap_or_default();
        summaries.book_sales.push(BookSales {
            title: title.clone(),
            total_sales: count.map_or(0, |n| n as u64),
        });
        summaries.book_ratings.push(BookRating {
            title,
            average_rating: mean,
        });
    }

    Ok(summaries)
}
