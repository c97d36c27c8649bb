//! Temporal validity window of each policy.
//!
//! `policy_start_date_analysis` is the decision date, falling back to the
//! implementation start. `policy_end_date_analysis` is the implementation
//! end, falling back to the analysis horizon for policies in force. Records
//! whose window stays unresolved are dropped, and the pipeline aborts if any
//! unresolved record survives that drop.

use crate::columns;
use crate::error::{PolicyError, Result};
use crate::utils::{string_values, trimmed};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// First year of the analysis window for one record.
pub fn derive_start(decision: Option<&str>, implementation_start: Option<&str>) -> Option<String> {
    trimmed(decision)
        .or_else(|| trimmed(implementation_start))
        .map(str::to_string)
}

/// Last year of the analysis window for one record.
///
/// An explicit end date wins over the in-force rule. Records with neither
/// are left unresolved.
pub fn derive_end(
    implementation_end: Option<&str>,
    state: Option<&str>,
    in_force_state: &str,
    range_end: i32,
) -> Option<String> {
    if let Some(end) = trimmed(implementation_end) {
        return Some(end.to_string());
    }
    (trimmed(state) == Some(in_force_state.trim())).then(|| range_end.to_string())
}

/// Row counts dropped while deriving the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStats {
    pub dropped_without_start: usize,
    pub dropped_without_end: usize,
}

/// Appends the analysis window columns and drops unresolved records.
pub struct WindowDeriver<'a> {
    in_force_state: &'a str,
    range_end: i32,
}

impl<'a> WindowDeriver<'a> {
    pub fn new(in_force_state: &'a str, range_end: i32) -> Self {
        Self {
            in_force_state,
            range_end,
        }
    }

    pub fn derive(&self, df: DataFrame) -> Result<(DataFrame, WindowStats)> {
        let mut stats = WindowStats::default();

        let decision = string_values(&df, columns::DATE_OF_DECISION)?;
        let start = string_values(&df, columns::START_DATE_OF_IMPLEMENTATION)?;
        let analysis_start: Vec<Option<String>> = decision
            .iter()
            .zip(&start)
            .map(|(d, s)| derive_start(d.as_deref(), s.as_deref()))
            .collect();
        let (df, dropped) = attach_and_drop_unresolved(df, columns::START_DATE_ANALYSIS, analysis_start)?;
        stats.dropped_without_start = dropped;
        ensure_resolved(&df, columns::START_DATE_ANALYSIS)?;

        let end = string_values(&df, columns::END_DATE_OF_IMPLEMENTATION)?;
        let state = string_values(&df, columns::IMPLEMENTATION_STATE)?;
        let analysis_end: Vec<Option<String>> = end
            .iter()
            .zip(&state)
            .map(|(e, s)| derive_end(e.as_deref(), s.as_deref(), self.in_force_state, self.range_end))
            .collect();
        let (df, dropped) = attach_and_drop_unresolved(df, columns::END_DATE_ANALYSIS, analysis_end)?;
        stats.dropped_without_end = dropped;
        ensure_resolved(&df, columns::END_DATE_ANALYSIS)?;

        debug!(
            "Window derivation dropped {} record(s) without start, {} without end",
            stats.dropped_without_start, stats.dropped_without_end
        );
        Ok((df, stats))
    }
}

fn attach_and_drop_unresolved(
    mut df: DataFrame,
    column: &str,
    values: Vec<Option<String>>,
) -> Result<(DataFrame, usize)> {
    let keep: Vec<bool> = values.iter().map(Option::is_some).collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    df.with_column(Series::new(column.into(), values))
        .map_err(|e| PolicyError::CleaningFailed(format!("adding '{}': {}", column, e)))?;
    if dropped == 0 {
        return Ok((df, 0));
    }
    let mask = BooleanChunked::from_slice("resolved".into(), &keep);
    let df = df
        .filter(&mask)
        .map_err(|e| PolicyError::CleaningFailed(e.to_string()))?;
    Ok((df, dropped))
}

/// Abort when a derived window column still holds unresolved values.
pub fn ensure_resolved(df: &DataFrame, column: &str) -> Result<()> {
    let unresolved = df
        .column(column)
        .map_err(|_| PolicyError::ColumnNotFound(column.to_string()))?
        .null_count();
    if unresolved > 0 {
        return Err(PolicyError::UnresolvedWindow {
            column: column.to_string(),
            rows: unresolved,
        });
    }
    Ok(())
}
