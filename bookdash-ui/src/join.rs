//! Key-based table joins
//!
//! Output header is the left header followed by the right header minus the
//! key column. A right column whose name is already taken is renamed
//! `{column}_{right table name}`, then `_2`, `_3`, ... until unique.
//!
//! Keys compare by text. Null keys never match. A left join also adds a
//! boolean `_matched_{right table name}` column: null where no right
//! record matched, so a left-join miss stays distinguishable from a short
//! source row even when both leave the right columns null.

use bookdash_common::{Result, Table};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

const LEFT_ROW: &str = "_left_row";
const RIGHT_ROW: &str = "_right_row";
const RIGHT_KEY: &str = "_right_key";

/// Join mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Keep only records with a key match on both sides
    Inner,
    /// Keep every left record; unmatched right columns are null
    Left,
}

impl JoinMode {
    fn join_type(self) -> JoinType {
        match self {
            JoinMode::Inner => JoinType::Inner,
            JoinMode::Left => JoinType::Left,
        }
    }
}

/// Indicator column a left join adds for `right_table`
pub fn match_column(right_table: &str) -> String {
    format!("_matched_{}", right_table)
}

/// Per-record match flags of a left join against `right_table`
///
/// `None` if the table did not come out of such a join.
pub fn matched_records(table: &Table, right_table: &str) -> Result<Option<Vec<bool>>> {
    Ok(table
        .text_values(&match_column(right_table))?
        .map(|flags| flags.into_iter().map(|f| f.is_some()).collect()))
}

/// (source name, output name) for the right table's non-key columns
fn right_column_names(left_columns: &[String], right: &Table, key: &str) -> Vec<(String, String)> {
    let mut taken: HashSet<String> = left_columns.iter().cloned().collect();
    let mut out = Vec::new();

    for column in right.columns() {
        if column == key {
            continue;
        }

        let mut name = column.clone();
        if taken.contains(&name) {
            let base = format!("{}_{}", column, right.name());
            name = base.clone();
            let mut n = 2;
            while taken.contains(&name) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
        }

        taken.insert(name.clone());
        out.push((column, name));
    }

    out
}

/// Join `left` with `right` on the column `key`
///
/// Each left record is paired with every right record sharing its key, in
/// right-table order. Result order follows the left table.
pub fn join(left: &Table, right: &Table, key: &str, mode: JoinMode) -> Result<Table> {
    let name = format!("{}+{}", left.name(), right.name());
    if left.frame().width() == 0 {
        return Ok(Table::empty(name));
    }

    let left_columns = left.columns();
    let right_columns = right_column_names(&left_columns, right, key);
    let matched = match_column(right.name());

    if !left.has_column(key) || !right.has_column(key) {
        debug!(left = left.name(), right = right.name(), key, ?mode, "Join key column missing");
        return join_without_key(left, &right_columns, &matched, mode).map(|f| Table::from_frame(name, f));
    }

    let keys = right.frame().column(key)?.as_materialized_series().drop_nulls();
    let duplicates = keys.len().saturating_sub(keys.n_unique()?);
    if duplicates > 0 {
        warn!(
            table = right.name(),
            key,
            duplicates,
            "Right-side join key is not unique; matching records fan out"
        );
    }

    let mut right_select = vec![col(key).alias(RIGHT_KEY), col(RIGHT_ROW)];
    right_select.extend(
        right_columns
            .iter()
            .map(|(source, output)| col(source.as_str()).alias(output.as_str())),
    );
    if mode == JoinMode::Left {
        right_select.push(lit(true).alias(matched.as_str()));
    }

    let joined = left
        .lazy()
        .with_row_index(LEFT_ROW, None)
        .join(
            right.lazy().with_row_index(RIGHT_ROW, None).select(right_select),
            [col(key)],
            [col(RIGHT_KEY)],
            JoinArgs::new(mode.join_type()),
        )
        .sort_by_exprs(
            [col(LEFT_ROW), col(RIGHT_ROW)],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    let unmatched = match mode {
        JoinMode::Inner => {
            let kept = joined.column(LEFT_ROW)?.as_materialized_series().n_unique()?;
            left.len().saturating_sub(kept)
        }
        JoinMode::Left => joined.column(&matched)?.null_count(),
    };

    let mut output = left_columns;
    output.extend(right_columns.into_iter().map(|(_, out)| out));
    if mode == JoinMode::Left {
        output.push(matched);
    }
    let frame = joined.select(output)?;

    debug!(
        left = left.name(),
        right = right.name(),
        key,
        ?mode,
        left_rows = left.len(),
        right_rows = right.len(),
        unmatched,
        result_rows = frame.height(),
        "Joined tables"
    );

    Ok(Table::from_frame(name, frame))
}

/// A join where one side lacks the key: nothing matches
fn join_without_key(
    left: &Table,
    right_columns: &[(String, String)],
    matched: &str,
    mode: JoinMode,
) -> Result<DataFrame> {
    let mut frame = match mode {
        JoinMode::Inner => left.frame().clear(),
        JoinMode::Left => left.frame().clone(),
    };
    let height = frame.height();

    for (_, output) in right_columns {
        frame.with_column(Column::full_null(output.as_str().into(), height, &DataType::String))?;
    }
    if mode == JoinMode::Left {
        frame.with_column(Column::full_null(matched.into(), height, &DataType::Boolean))?;
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookdash_common::Grid;

    fn table(name: &str, rows: &[&[&str]]) -> Table {
        let grid: Grid = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect();
        Table::from_grid(name, grid).unwrap()
    }

    fn texts(table: &Table, column: &str) -> Vec<Option<String>> {
        table.text_values(column).unwrap().unwrap()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let sales = table("sales", &[&["OrderID", "ISBN"], &["1", "X"], &["2", "Y"], &["3", "X"]]);
        let editions = table("edition", &[&["ISBN", "BookID"], &["X", "10"], &["Z", "11"]]);

        let out = join(&sales, &editions, "ISBN", JoinMode::Inner).unwrap();
        assert_eq!(out.name(), "sales+edition");
        assert_eq!(out.columns(), names(&["OrderID", "ISBN", "BookID"]));
        assert_eq!(texts(&out, "OrderID"), vec![some("1"), some("3")]);
        assert_eq!(texts(&out, "BookID"), vec![some("10"), some("10")]);
    }

    #[test]
    fn test_inner_join_keys_exist_on_both_sides() {
        let left = table("l", &[&["K", "V"], &["a", "1"], &["b", "2"], &["c", "3"], &["a", "4"]]);
        let right = table("r", &[&["K", "W"], &["a", "x"], &["c", "y"], &["d", "z"]]);

        let out = join(&left, &right, "K", JoinMode::Inner).unwrap();
        assert!(out.len() <= left.len());

        let keys = |t: &Table| -> HashSet<String> { texts(t, "K").into_iter().flatten().collect() };
        let (left_keys, right_keys) = (keys(&left), keys(&right));
        for k in keys(&out) {
            assert!(left_keys.contains(&k) && right_keys.contains(&k));
        }
        assert_eq!(texts(&out, "V"), vec![some("1"), some("3"), some("4")]);
    }

    #[test]
    fn test_left_join_keeps_every_left_row() {
        let books = table("book", &[&["BookID", "Title", "AuthID"], &["1", "A", "7"], &["2", "B", "8"]]);
        let authors = table("author", &[&["AuthID", "First Name", "Last Name"], &["7", "Ann", "Lee"]]);

        let out = join(&books, &authors, "AuthID", JoinMode::Left).unwrap();
        assert_eq!(out.len(), books.len());
        assert_eq!(texts(&out, "Title"), vec![some("A"), some("B")]);
        assert_eq!(texts(&out, "First Name"), vec![some("Ann"), None]);
        assert_eq!(texts(&out, "Last Name"), vec![some("Lee"), None]);
        assert_eq!(matched_records(&out, "author").unwrap(), Some(vec![true, false]));
    }

    #[test]
    fn test_left_join_distinguishes_missing_from_absent() {
        let books = table("book", &[&["BookID", "AuthID"], &["1", "7"]]);
        // Author row shorter than header: Last Name is null but the row matched
        let authors = table("author", &[&["AuthID", "First Name", "Last Name"], &["7", "Ann"]]);

        let out = join(&books, &authors, "AuthID", JoinMode::Left).unwrap();
        assert_eq!(texts(&out, "Last Name"), vec![None]);
        assert_eq!(matched_records(&out, "author").unwrap(), Some(vec![true]));
    }

    #[test]
    fn test_left_join_with_empty_right() {
        let books = table("book", &[&["BookID", "AuthID"], &["1", "7"], &["2", "8"]]);
        let out = join(&books, &Table::empty("author"), "AuthID", JoinMode::Left).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.columns(), names(&["BookID", "AuthID", "_matched_author"]));
        assert_eq!(matched_records(&out, "author").unwrap(), Some(vec![false, false]));
    }

    #[test]
    fn test_inner_join_with_empty_input() {
        let editions = table("edition", &[&["ISBN", "BookID"], &["X", "1"]]);
        let out = join(&Table::empty("sales"), &editions, "ISBN", JoinMode::Inner).unwrap();
        assert!(out.is_empty());

        let sales = table("sales", &[&["OrderID", "ISBN"], &["1", "X"]]);
        let out = join(&sales, &Table::empty("edition"), "ISBN", JoinMode::Inner).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns(), names(&["OrderID", "ISBN"]));
    }

    #[test]
    fn test_inner_join_has_no_match_column() {
        let sales = table("sales", &[&["ISBN"], &["X"]]);
        let editions = table("edition", &[&["ISBN", "BookID"], &["X", "1"]]);
        let out = join(&sales, &editions, "ISBN", JoinMode::Inner).unwrap();
        assert!(matched_records(&out, "edition").unwrap().is_none());
    }

    #[test]
    fn test_collision_suffixes_right_column() {
        let editions = table("edition", &[&["BookID", "Price"], &["1", "9.99"]]);
        let books = table("book", &[&["BookID", "Price", "Price_book"], &["1", "old", "older"]]);

        let out = join(&editions, &books, "BookID", JoinMode::Inner).unwrap();
        assert_eq!(out.columns(), names(&["BookID", "Price", "Price_book", "Price_book_book"]));
        assert_eq!(texts(&out, "Price"), vec![some("9.99")]);
        assert_eq!(texts(&out, "Price_book"), vec![some("old")]);
        assert_eq!(texts(&out, "Price_book_book"), vec![some("older")]);
    }

    #[test]
    fn test_collision_numbering_is_deterministic() {
        let left = table("l", &[&["K", "V", "V_r"], &["a", "1", "2"]]);
        let right = table("r", &[&["K", "V"], &["a", "3"]]);

        let out = join(&left, &right, "K", JoinMode::Inner).unwrap();
        assert_eq!(out.columns(), names(&["K", "V", "V_r", "V_r_2"]));
        assert_eq!(texts(&out, "V_r_2"), vec![some("3")]);
    }

    #[test]
    fn test_missing_keys_never_match() {
        let left = table("l", &[&["V", "K"], &["1"]]);
        let right = table("r", &[&["K", "W"], &["", "x"]]);

        assert!(join(&left, &right, "K", JoinMode::Inner).unwrap().is_empty());
        let out = join(&left, &right, "K", JoinMode::Left).unwrap();
        assert_eq!(texts(&out, "W"), vec![None]);
        assert_eq!(matched_records(&out, "r").unwrap(), Some(vec![false]));
    }

    #[test]
    fn test_duplicate_right_keys_fan_out() {
        let left = table("l", &[&["K", "V"], &["a", "1"], &["b", "2"]]);
        let right = table("r", &[&["K", "W"], &["a", "1"], &["b", "3"], &["a", "2"]]);

        let out = join(&left, &right, "K", JoinMode::Inner).unwrap();
        assert_eq!(texts(&out, "V"), vec![some("1"), some("1"), some("2")]);
        assert_eq!(texts(&out, "W"), vec![some("1"), some("2"), some("3")]);
    }
}
