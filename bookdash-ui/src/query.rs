//! Query façade over one immutable dashboard snapshot
//!
//! Every operation is a pure read parameterised by an optional selected
//! title. `None` and blank strings both mean "no selection"; any other
//! value is compared with stored titles exactly as given.

use bookdash_common::config::{DashboardConfig, SeriesMode};
use bookdash_common::{Quarter, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::derive::{summarize, AuthorField, BookRating, BookSales, MergedRecord, Summaries};

/// Series shape when no title is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    All,
    Top(usize),
}

impl DisplayMode {
    pub fn from_config(config: &DashboardConfig) -> Self {
        match config.series_mode {
            SeriesMode::All => DisplayMode::All,
            SeriesMode::Top => DisplayMode::Top(config.top_n),
        }
    }
}

/// Ranking metric for `top_n`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalSales,
    AverageRating,
}

/// Sales per quarter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub quarter: Quarter,
    pub total_sales: u64,
}

/// One entry of a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBook {
    pub title: String,
    pub rank: usize,
    pub value: f64,
}

/// Author of the selected title
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorLookup {
    NotSelected,
    UnknownTitle,
    /// Title exists but no author row matched
    Absent,
    Resolved {
        first_name: Option<String>,
        last_name: Option<String>,
    },
}

impl AuthorLookup {
    /// Text shown in the author card
    pub fn display(&self) -> String {
        match self {
            AuthorLookup::NotSelected => "No book selected.".to_string(),
            AuthorLookup::UnknownTitle => "Book not found.".to_string(),
            AuthorLookup::Absent => "Unknown author".to_string(),
            AuthorLookup::Resolved {
                first_name,
                last_name,
            } => {
                let parts: Vec<&str> = [first_name.as_deref(), last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if parts.is_empty() {
                    "Unknown author".to_string()
                } else {
                    parts.join(" ")
                }
            }
        }
    }
}

/// Headline statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub total_sales: u64,
    pub unique_titles: usize,
    pub merged_records: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Immutable merged dataset with its derived summaries
#[derive(Debug, Clone)]
pub struct Dashboard {
    records: Vec<MergedRecord>,
    summaries: Summaries,
    loaded_at: DateTime<Utc>,
}

fn selection(selected: Option<&str>) -> Option<&str> {
    selected.filter(|s| !s.trim().is_empty())
}

/// Descending by key, stable for equal keys; `None` sorts last
fn sort_desc<T>(items: &mut [T], key: impl Fn(&T) -> Option<f64>) {
    items.sort_by(|a, b| match (key(a), key(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

impl Dashboard {
    pub fn new(records: Vec<MergedRecord>) -> Result<Self> {
        let summaries = summarize(&records)?;
        Ok(Self {
            records,
            summaries,
            loaded_at: Utc::now(),
        })
    }

    pub fn records(&self) -> &[MergedRecord] {
        &self.records
    }

    pub fn book_sales(&self) -> &[BookSales] {
        &self.summaries.book_sales
    }

    pub fn book_ratings(&self) -> &[BookRating] {
        &self.summaries.book_ratings
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Dropdown options, in summary order
    pub fn titles(&self) -> Vec<&str> {
        self.summaries
            .book_sales
            .iter()
            .map(|s| s.title.as_str())
            .collect()
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.summaries.book_sales.iter().any(|s| s.title == title)
    }

    pub fn overview(&self) -> Overview {
        Overview {
            total_sales: self.summaries.book_sales.iter().map(|s| s.total_sales).sum(),
            unique_titles: self.summaries.book_sales.len(),
            merged_records: self.records.len(),
            loaded_at: self.loaded_at,
        }
    }

    /// Total sales for the selected title, or every title per `mode`
    pub fn sales_series(&self, selected: Option<&str>, mode: DisplayMode) -> Vec<BookSales> {
        if let Some(title) = selection(selected) {
            return self
                .summaries
                .book_sales
                .iter()
                .filter(|s| s.title == title)
                .cloned()
                .collect();
        }

        let mut rows = self.summaries.book_sales.clone();
        if let DisplayMode::Top(n) = mode {
            sort_desc(&mut rows, |s| Some(s.total_sales as f64));
            rows.truncate(n);
        }
        rows
    }

    /// Average rating for the selected title, or every title per `mode`
    pub fn rating_series(&self, selected: Option<&str>, mode: DisplayMode) -> Vec<BookRating> {
        if let Some(title) = selection(selected) {
            return self
                .summaries
                .book_ratings
                .iter()
                .filter(|s| s.title == title)
                .cloned()
                .collect();
        }

        let mut rows = self.summaries.book_ratings.clone();
        if let DisplayMode::Top(n) = mode {
            sort_desc(&mut rows, |s| s.average_rating);
            rows.truncate(n);
        }
        rows
    }

    /// Sales per quarter for the selected title (or all records), Q1..Q4
    ///
    /// Quarters without sales are omitted.
    pub fn trend_series(&self, selected: Option<&str>) -> Vec<TrendPoint> {
        let title = selection(selected);
        let mut by_quarter: BTreeMap<Quarter, u64> = BTreeMap::new();

        for record in &self.records {
            if title.map_or(true, |t| record.title == t) {
                *by_quarter.entry(record.quarter).or_default() += 1;
            }
        }

        by_quarter
            .into_iter()
            .map(|(quarter, total_sales)| TrendPoint {
                quarter,
                total_sales,
            })
            .collect()
    }

    /// Highest `n` titles by `metric`, rank 1 = highest
    ///
    /// Equal values keep first-appearance order. Titles without a rating
    /// rank after every rated title.
    pub fn top_n(&self, n: usize, metric: Metric) -> Vec<RankedBook> {
        let mut ranked: Vec<(String, Option<f64>)> = match metric {
            Metric::TotalSales => self
                .summaries
                .book_sales
                .iter()
                .map(|s| (s.title.clone(), Some(s.total_sales as f64)))
                .collect(),
            Metric::AverageRating => self
                .summaries
                .book_ratings
                .iter()
                .map(|s| (s.title.clone(), s.average_rating))
                .collect(),
        };

        sort_desc(&mut ranked, |(_, value)| *value);

        ranked
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, (title, value))| RankedBook {
                title,
                rank: i + 1,
                value: value.unwrap_or(0.0),
            })
            .collect()
    }

    /// Author of the first record carrying the selected title
    pub fn author_of(&self, selected: Option<&str>) -> AuthorLookup {
        let Some(title) = selection(selected) else {
            return AuthorLookup::NotSelected;
        };

        match self.records.iter().find(|r| r.title == title) {
            None => AuthorLookup::UnknownTitle,
            Some(record) => match &record.author {
                AuthorField::Absent => AuthorLookup::Absent,
                AuthorField::Resolved {
                    first_name,
                    last_name,
                } => AuthorLookup::Resolved {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                },
            },
        }
    }
}
