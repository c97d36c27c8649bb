use crate::error::{PolicyError, Result};
use crate::taxonomy::ValidationReport;
use crate::types::RunReport;
use anyhow::Context;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes the pipeline outputs: the cleaned table, per-column error tables
/// and the JSON run summary.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write `df` as `<file_name>` in the output directory.
    pub fn write_table(&self, df: &mut DataFrame, file_name: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        write_csv(df, &path).map_err(report_error)?;
        info!("Saved: {}", path.display());
        Ok(path)
    }

    /// Write `error_<column>.csv` for every violated rule and remove stale
    /// error tables of rules that are now clean.
    ///
    /// Returns the written paths by column.
    pub fn write_error_tables(
        &self,
        report: &ValidationReport,
        source: &DataFrame,
    ) -> Result<BTreeMap<String, PathBuf>> {
        let mut written = BTreeMap::new();
        for violations in &report.columns {
            let file_name = violations.error_file_name();
            if violations.is_empty() {
                self.remove_stale(&file_name)?;
                continue;
            }
            let mut table = violations.error_table(source)?;
            let path = self.write_table(&mut table, &file_name)?;
            written.insert(violations.column.clone(), path);
        }
        Ok(written)
    }

    /// Write the run summary as `<base_name>_report.json`.
    pub fn write_run_report(&self, report: &RunReport, base_name: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("{}_report.json", base_name));
        let json = serde_json::to_string_pretty(report)?;
        write_bytes(json.as_bytes(), &path).map_err(report_error)?;
        info!("Report saved: {}", path.display());
        Ok(path)
    }

    fn remove_stale(&self, file_name: &str) -> Result<()> {
        let path = self.output_dir.join(file_name);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("removing stale {}", path.display()))
                .map_err(report_error)?;
            debug!("Removed stale error table: {}", path.display());
        }
        Ok(())
    }
}

fn write_csv(df: &mut DataFrame, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_bytes(content: &[u8], path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(content)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn report_error(e: anyhow::Error) -> PolicyError {
    PolicyError::ReportGenerationFailed(format!("{:#}", e))
}
