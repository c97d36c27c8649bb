//! Cleaning and indicator pipeline.
//!
//! This module provides the `Pipeline` struct and builder that turn the raw
//! policy table into the analysis-ready table.

use crate::cleaner::{DataCleaner, TypeCaster, WindowDeriver};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::indicators::IndicatorEngine;
use crate::io::load_policy_csv;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::reporting::ReportWriter;
use crate::types::{CleaningResult, CleaningSummary};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The cleaning and indicator pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use policy_processing::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::builder().range_end(2021).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// println!("{} policies kept", result.summary.rows_after);
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    writer: ReportWriter,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the policy CSV at `path` and process it.
    pub fn process_file(&self, path: &Path) -> Result<CleaningResult> {
        let df = load_policy_csv(path)?;
        self.process(df)
    }

    /// Run every cleaning stage on `df`.
    ///
    /// The cleaned table is written to the configured output path when
    /// `save_to_disk` is set.
    pub fn process(&self, df: DataFrame) -> Result<CleaningResult> {
        match self.process_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningResult> {
        info!("Starting cleaning pipeline...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            "Starting cleaning pipeline...",
        ));

        let mut summary = CleaningSummary {
            rows_before: df.height(),
            columns_before: df.width(),
            ..Default::default()
        };

        // Step 1: Drop backend columns and out-of-scope records
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Filtering,
            0.0,
            "Filtering records...",
        ));
        info!("Step 1: Filtering records...");

        let cleaner = DataCleaner::new(&self.config);
        let (df, actions) = cleaner.drop_backend_columns(df)?;
        summary.actions.extend(actions);
        let rows_before_filter = df.height();
        let (df, actions) = cleaner.filter_in_scope(df)?;
        summary.actions.extend(actions);
        summary.rows_out_of_scope = rows_before_filter - df.height();

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Filtering,
            1.0,
            format!("{} records in scope", df.height()),
        ));

        // Step 2: Temporal window
        self.report_progress(ProgressUpdate::new(
            PipelineStage::WindowDerivation,
            0.0,
            "Deriving analysis window...",
        ));
        info!("Step 2: Deriving analysis window...");

        let (df, window) = WindowDeriver::new(&self.config.in_force_state, self.config.range_end)
            .derive(df)
            .context("window derivation")?;
        summary.window = window;
        if window.dropped_without_start + window.dropped_without_end > 0 {
            summary.actions.push(format!(
                "Dropped {} record(s) without start year and {} without end year",
                window.dropped_without_start, window.dropped_without_end
            ));
        }

        // Step 3: Types
        self.report_progress(ProgressUpdate::new(
            PipelineStage::TypeCasting,
            0.0,
            "Casting column types...",
        ));
        info!("Step 3: Casting column types...");

        let (df, levels) = TypeCaster.cast(df).context("type casting")?;
        for (column, observed) in &levels {
            debug!("  {}: {} level(s)", column, observed.len());
        }
        summary.category_levels = levels;

        // Step 4: Indicators
        self.report_progress(ProgressUpdate::new(
            PipelineStage::IndicatorDerivation,
            0.0,
            "Deriving indicators...",
        ));
        info!("Step 4: Deriving indicators...");

        let (mut df, audit) = IndicatorEngine::new(&self.config.indicator_tables)
            .apply(df)
            .context("indicator derivation")?;
        summary.indicator_audit = audit;

        summary.rows_after = df.height();
        summary.columns_after = df.width();

        // Step 5: Output
        if self.config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::WritingOutputs,
                0.0,
                "Writing cleaned table...",
            ));
            info!("Step 5: Writing cleaned table...");
            let file_name = format!("{}.csv", self.config.output_name);
            let path = self.writer.write_table(&mut df, &file_name)?;
            summary.output_file = Some(path);
        } else {
            debug!("Step 5: Skipping output (save_to_disk disabled)");
        }

        info!(
            "Cleaning complete: {} -> {} records, {} columns",
            summary.rows_before, summary.rows_after, summary.columns_after
        );

        Ok(CleaningResult { data: df, summary })
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Fails with [`PolicyError::InvalidConfig`](crate::error::PolicyError::InvalidConfig)
    /// if the configuration is invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let writer = ReportWriter::new(config.output_dir.clone());

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            writer,
        })
    }
}
