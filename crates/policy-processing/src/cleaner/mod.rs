//! Data cleaning for the policy table.
//!
//! This module provides:
//! - Dropping backend-only columns
//! - Keeping national policies with instrument, decision date and sector
//! - Deriving the temporal analysis window
//! - Casting categorical and year columns

mod type_caster;
mod window;

pub use type_caster::{CategoryLevels, TypeCaster};
pub use window::{WindowDeriver, WindowStats, derive_end, derive_start, ensure_resolved};

use crate::columns;
use crate::config::PipelineConfig;
use crate::error::{PolicyError, Result};
use crate::utils::{column_names, is_present, require_columns, string_values};
use polars::prelude::*;
use tracing::{debug, info};

/// Row and column cleaning driven by the pipeline configuration.
pub struct DataCleaner<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataCleaner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Drop the configured backend columns that are present.
    pub fn drop_backend_columns(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let present = column_names(&df);
        let to_drop: Vec<PlSmallStr> = self
            .config
            .dropped_columns
            .iter()
            .filter(|c| present.contains(c))
            .map(|c| c.as_str().into())
            .collect();

        let mut actions = Vec::new();
        if to_drop.is_empty() {
            actions.push("No backend columns to drop".to_string());
            return Ok((df, actions));
        }

        debug!("Dropping {} backend columns", to_drop.len());
        actions.push(format!("Dropped {} backend columns: {:?}", to_drop.len(), to_drop));
        Ok((df.drop_many(to_drop), actions))
    }

    /// Keep records in jurisdiction scope that carry an instrument type, a
    /// decision date and a sector. Excluded records are not an error.
    pub fn filter_in_scope(&self, df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        require_columns(&df, &columns::REQUIRED_FOR_CLEANING)?;

        info!("Filtering records in scope '{}'...", self.config.jurisdiction_scope);

        let scope = self.config.jurisdiction_scope.trim();
        let jurisdiction = string_values(&df, columns::JURISDICTION)?;
        let instrument = string_values(&df, columns::INSTRUMENT_TYPE)?;
        let decision = string_values(&df, columns::DATE_OF_DECISION)?;
        let sector = string_values(&df, columns::SECTOR_NAME)?;

        let keep: Vec<bool> = (0..df.height())
            .map(|i| {
                jurisdiction[i].as_deref().map(str::trim) == Some(scope)
                    && is_present(instrument[i].as_deref())
                    && is_present(decision[i].as_deref())
                    && is_present(sector[i].as_deref())
            })
            .collect();

        let before = df.height();
        let mask = BooleanChunked::from_slice("in_scope".into(), &keep);
        let df = df
            .filter(&mask)
            .map_err(|e| PolicyError::CleaningFailed(e.to_string()))?;
        let removed = before - df.height();

        let mut actions = Vec::new();
        if removed > 0 {
            let pct = (removed as f64 / before as f64) * 100.0;
            actions.push(format!(
                "Excluded {} out-of-scope records ({:.1}%)",
                removed, pct
            ));
            debug!("Excluded {} out-of-scope records", removed);
        } else {
            actions.push("All records in scope".to_string());
        }

        Ok((df, actions))
    }
}
