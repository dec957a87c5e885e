//! In-memory table model
//!
//! A `Table` is a named polars `DataFrame`. Source tables hold one nullable
//! string column per header cell; a null is a field the source row did not
//! supply. Tables are immutable once built: every transformation consumes or
//! borrows the input and produces a new table.

use polars::prelude::*;

use crate::Result;

/// Raw 2-D string grid as returned by a spreadsheet `values` range.
/// Row 0 is the header.
pub type Grid = Vec<Vec<String>>;

/// Named table backed by a `DataFrame`
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    frame: DataFrame,
}

impl Default for Table {
    fn default() -> Self {
        Self::empty("")
    }
}

impl Table {
    /// Table with zero records and no known columns
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frame: DataFrame::empty(),
        }
    }

    pub fn from_frame(name: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }

    /// Build a table from a raw grid (row 0 = header)
    ///
    /// Rows are zipped positionally against the header: short rows leave
    /// the trailing fields null, long rows are truncated. A repeated header
    /// name keeps its first column. An empty grid yields an empty table.
    pub fn from_grid(name: impl Into<String>, grid: Grid) -> Result<Self> {
        let mut rows = grid.into_iter();
        let Some(header) = rows.next() else {
            return Ok(Self::empty(name));
        };
        let rows: Vec<Vec<String>> = rows.collect();

        let mut columns: Vec<Column> = Vec::with_capacity(header.len());
        for (idx, column) in header.iter().enumerate() {
            if header[..idx].contains(column) {
                continue;
            }
            let values: Vec<Option<String>> = rows.iter().map(|row| row.get(idx).cloned()).collect();
            columns.push(Column::new(column.as_str().into(), values));
        }

        Ok(Self::from_frame(name, DataFrame::new(columns)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Column names in order
    pub fn columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.frame.get_column_index(column).is_some()
    }

    /// One column as text, `None` if the table has no such column
    pub fn text_values(&self, column: &str) -> Result<Option<Vec<Option<String>>>> {
        if !self.has_column(column) {
            return Ok(None);
        }

        let series = self
            .frame
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let values = series.str()?.into_iter().map(|v| v.map(str::to_string)).collect();
        Ok(Some(values))
    }

    /// One column as numbers; text that does not parse becomes `None`
    pub fn number_values(&self, column: &str) -> Result<Option<Vec<Option<f64>>>> {
        if !self.has_column(column) {
            return Ok(None);
        }

        let series = self
            .frame
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let values = series
            .f64()?
            .into_iter()
            .map(|v| v.filter(|n| n.is_finite()))
            .collect();
        Ok(Some(values))
    }

    /// Add (or replace) a string column holding `value` in every record
    ///
    /// A table without columns has no records to tag and is returned as is.
    pub fn with_constant_column(self, column: &str, value: &str) -> Result<Self> {
        if self.frame.width() == 0 {
            return Ok(self);
        }

        let mut frame = self.frame;
        let values = vec![value.to_string(); frame.height()];
        frame.with_column(Column::new(column.into(), values))?;
        Ok(Self::from_frame(self.name, frame))
    }

    /// Row-wise union of several tables
    ///
    /// The result header is the union of the input headers in order of first
    /// appearance. Columns a table does not define are null in that table's
    /// records.
    pub fn concat(name: impl Into<String>, tables: &[Table]) -> Result<Self> {
        let frames: Vec<LazyFrame> = tables
            .iter()
            .filter(|t| t.frame.width() > 0)
            .map(Table::lazy)
            .collect();

        if frames.is_empty() {
            return Ok(Self::empty(name));
        }

        let frame = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
        Ok(Self::from_frame(name, frame))
    }
}
