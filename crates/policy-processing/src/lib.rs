//! Climate Policy Database Processing Library
//!
//! Cleaning, indicator derivation and taxonomy validation for a tabular
//! database of national climate policies, built on Polars.
//!
//! # Overview
//!
//! Two independent pipelines run over the same source table:
//!
//! - **Cleaning & indicators** ([`Pipeline`]): drops backend columns, keeps
//!   national policies with an instrument, decision date and sector, derives
//!   the analysis window, casts types and appends boolean instrument, policy
//!   option and sector indicators plus `fuzziness` and `sector_specificity`.
//! - **Taxonomy validation** ([`ValidationPipeline`]): checks every value of
//!   the multi-valued controlled columns against its vocabulary and writes
//!   one error table per violated column.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use policy_processing::{Pipeline, PipelineConfig, ValidationPipeline, load_policy_csv};
//! use std::path::Path;
//!
//! let df = load_policy_csv(Path::new("data/policy_database.csv"))?;
//!
//! let report = ValidationPipeline::builder().build()?.run(&df)?;
//! println!("{} taxonomy violations", report.report.total_violations());
//!
//! let result = Pipeline::builder()
//!     .config(PipelineConfig::builder().range_end(2021).build()?)
//!     .build()?
//!     .process(df)?;
//! println!("{} policies ready for analysis", result.summary.rows_after);
//! ```
//!
//! # Configuration
//!
//! [`PipelineConfig`] and [`ValidationConfig`] are immutable once built and
//! can also be deserialized from JSON. The indicator lookup and scoring tables
//! live in [`IndicatorTables`] inside the pipeline configuration.

pub mod cleaner;
pub mod columns;
pub mod config;
pub mod error;
pub mod indicators;
pub mod io;
pub mod pipeline;
pub mod reporting;
pub mod taxonomy;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{DataCleaner, TypeCaster, WindowDeriver};
pub use config::{
    ConfigValidationError, DuplicatePolicy, PipelineConfig, PipelineConfigBuilder, TaxonomyRule,
    ValidationConfig, ValidationConfigBuilder, default_taxonomy_rules,
};
pub use error::{PolicyError, Result as PolicyResult, ResultExt};
pub use indicators::{IndicatorAudit, IndicatorEngine, IndicatorTables, PolicyIndicators};
pub use io::load_policy_csv;
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate, ValidationPipeline, ValidationPipelineBuilder,
};
pub use reporting::ReportWriter;
pub use taxonomy::{ColumnViolations, TaxonomyValidator, TaxonomyVocabulary, ValidationReport};
pub use types::{
    CleaningResult, CleaningSummary, ColumnReport, RunReport, ValidationResult, ValidationSummary,
};
