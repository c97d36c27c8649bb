//! Shared utilities for the policy processing pipelines.
//!
//! Cell-level string helpers plus the few Polars accessors every stage needs.

use crate::error::{PolicyError, Result};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

static INNER_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

// =============================================================================
// Cell Utilities
// =============================================================================

/// Check whether a cell carries a value (non-null and not blank).
#[inline]
pub fn is_present(cell: Option<&str>) -> bool {
    cell.is_some_and(|v| !v.trim().is_empty())
}

/// Trim a cell, mapping blank values to `None`.
pub fn trimmed(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a multi-valued cell on any of `delimiters`, trimming every token.
///
/// Empty tokens are kept so callers can decide whether `"A,,B"` is valid.
///
/// ```rust,ignore
/// assert_eq!(split_tokens("Mitigation, Foo", &[',']), vec!["Mitigation", "Foo"]);
/// ```
pub fn split_tokens<'a>(cell: &'a str, delimiters: &[char]) -> Vec<&'a str> {
    cell.split(|c| delimiters.contains(&c)).map(str::trim).collect()
}

/// Normalize a token for table lookups: trim, collapse inner whitespace and
/// lowercase.
pub fn normalize_token(token: &str) -> String {
    INNER_WHITESPACE
        .replace_all(token.trim(), " ")
        .to_lowercase()
}

/// A year cell that is neither blank nor a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidYear;

/// Parse a year cell such as `"2015"`, `" 2015.0 "` or `"2014.6"`.
///
/// Returns `Ok(None)` for blank cells and [`InvalidYear`] for values that are
/// not finite numbers or do not fit an `i32` after rounding.
pub fn parse_year(cell: &str) -> std::result::Result<Option<i32>, InvalidYear> {
    let cleaned = cell.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let value: f64 = cleaned.parse().map_err(|_| InvalidYear)?;
    if !value.is_finite() {
        return Err(InvalidYear);
    }
    let rounded = value.round();
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return Err(InvalidYear);
    }
    Ok(Some(rounded as i32))
}

// =============================================================================
// DataFrame Utilities
// =============================================================================

/// Fail with [`PolicyError::ColumnNotFound`] for the first missing column.
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    for name in columns {
        if df.column(name).is_err() {
            return Err(PolicyError::ColumnNotFound((*name).to_string()));
        }
    }
    Ok(())
}

/// Whether the DataFrame has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Read a column as owned optional strings, casting non-string columns.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PolicyError::ColumnNotFound(name.to_string()))?;
    let as_text = column.cast(&DataType::String)?;
    let values = as_text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Owned list of column names, in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}
