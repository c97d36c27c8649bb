//! Type casting of the categorical and year columns.

use crate::columns;
use crate::error::{PolicyError, Result};
use crate::utils::{has_column, parse_year, string_values, trimmed};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Observed level set of each categorical column, sorted.
pub type CategoryLevels = BTreeMap<String, Vec<String>>;

/// Casts the fixed categorical columns and year columns of the cleaned table.
pub struct TypeCaster;

impl TypeCaster {
    /// Normalize categorical columns and cast year columns to `Int32`.
    ///
    /// Categorical columns are trimmed with blanks mapped to null; their
    /// observed levels are returned. Optional categorical columns that are
    /// absent are skipped. A year cell that does not parse after trimming is
    /// fatal.
    pub fn cast(&self, mut df: DataFrame) -> Result<(DataFrame, CategoryLevels)> {
        let mut levels = CategoryLevels::new();

        for name in columns::CATEGORY_COLUMNS {
            if !has_column(&df, name) {
                debug!("Categorical column '{}' absent, skipping", name);
                continue;
            }
            let (series, observed) = Self::categorical(&df, name)?;
            df.replace(name, series)?;
            levels.insert(name.to_string(), observed);
        }

        for name in columns::YEAR_COLUMNS {
            let series = Self::year(&df, name)?;
            df.replace(name, series)?;
        }

        debug!(
            "Cast {} categorical and {} year columns",
            levels.len(),
            columns::YEAR_COLUMNS.len()
        );
        Ok((df, levels))
    }

    fn categorical(df: &DataFrame, name: &str) -> Result<(Series, Vec<String>)> {
        let values: Vec<Option<String>> = string_values(df, name)?
            .iter()
            .map(|v| trimmed(v.as_deref()).map(str::to_string))
            .collect();
        let observed: BTreeSet<&String> = values.iter().flatten().collect();
        let observed = observed.into_iter().cloned().collect();
        Ok((Series::new(name.into(), values), observed))
    }

    fn year(df: &DataFrame, name: &str) -> Result<Series> {
        let raw = string_values(df, name)?;
        let mut years: Vec<Option<i32>> = Vec::with_capacity(raw.len());
        for (row, cell) in raw.iter().enumerate() {
            let Some(cell) = cell else {
                years.push(None);
                continue;
            };
            let year = parse_year(cell).map_err(|_| PolicyError::TypeCastFailed {
                column: name.to_string(),
                target_type: "Int32".to_string(),
                row,
                value: cell.clone(),
            })?;
            years.push(year);
        }
        Ok(Series::new(name.into(), years))
    }
}
