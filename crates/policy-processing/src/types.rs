//! Result and summary types shared by the pipelines, the writer and the CLI.

use crate::cleaner::{CategoryLevels, WindowStats};
use crate::indicators::IndicatorAudit;
use crate::taxonomy::ValidationReport;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Counts and audits of a cleaning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub columns_before: usize,
    pub rows_after: usize,
    pub columns_after: usize,
    /// Records outside the jurisdiction scope or lacking instrument,
    /// decision date or sector.
    pub rows_out_of_scope: usize,
    pub window: WindowStats,
    pub category_levels: CategoryLevels,
    pub indicator_audit: IndicatorAudit,
    pub actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl CleaningSummary {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Output of the cleaning pipeline.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The analysis-ready table.
    pub data: DataFrame,
    pub summary: CleaningSummary,
}

/// Per-column entry of a validation summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub column: String,
    pub vocabulary_file: String,
    pub violations: usize,
    pub unknown_tokens: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<PathBuf>,
}

/// Counts of a validator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub rows_checked: usize,
    pub total_violations: usize,
    pub columns: Vec<ColumnReport>,
}

impl ValidationSummary {
    /// Summarize a report; `error_files` maps a column to the table written
    /// for it.
    pub fn from_report(report: &ValidationReport, error_files: &BTreeMap<String, PathBuf>) -> Self {
        let columns = report
            .columns
            .iter()
            .map(|c| ColumnReport {
                column: c.column.clone(),
                vocabulary_file: c.vocabulary_file.clone(),
                violations: c.len(),
                unknown_tokens: c.unknown_tokens.clone(),
                error_file: error_files.get(&c.column).cloned(),
            })
            .collect();
        Self {
            rows_checked: report.rows_checked,
            total_violations: report.total_violations(),
            columns,
        }
    }
}

/// Output of the validation pipeline.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub report: ValidationReport,
    /// Error tables written in this run, by column.
    pub error_files: BTreeMap<String, PathBuf>,
}

impl ValidationResult {
    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary::from_report(&self.report, &self.error_files)
    }
}

/// JSON run summary printed with `--json` or written with `--emit-report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RunReport {
    Clean {
        input_file: String,
        summary: CleaningSummary,
    },
    Validate {
        input_file: String,
        summary: ValidationSummary,
    },
}
