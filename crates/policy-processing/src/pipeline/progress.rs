//! Progress reporting for the cleaning and validation pipelines.
//!
//! # Example
//!
//! ```rust,ignore
//! use policy_processing::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .process(df);
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the two pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Pipeline is starting
    Initializing,
    /// Dropping backend columns and out-of-scope records
    Filtering,
    /// Deriving the analysis start and end years
    WindowDerivation,
    /// Casting categorical and year columns
    TypeCasting,
    /// Deriving instrument, option and sector indicators
    IndicatorDerivation,
    /// Loading the taxonomy vocabularies
    LoadingVocabularies,
    /// Checking controlled columns against their taxonomies
    TaxonomyCheck,
    /// Writing output tables
    WritingOutputs,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Filtering => "Filtering Records",
            Self::WindowDerivation => "Deriving Window",
            Self::TypeCasting => "Casting Types",
            Self::IndicatorDerivation => "Deriving Indicators",
            Self::LoadingVocabularies => "Loading Vocabularies",
            Self::TaxonomyCheck => "Checking Taxonomy",
            Self::WritingOutputs => "Writing Outputs",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run spent in this stage (0.0 - 1.0).
    ///
    /// Cleaning stages sum to 1.0, as do validation stages; both end with
    /// `WritingOutputs`.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::Filtering => 0.15,
            Self::WindowDerivation => 0.15,
            Self::TypeCasting => 0.15,
            Self::IndicatorDerivation => 0.35,
            Self::LoadingVocabularies => 0.20,
            Self::TaxonomyCheck => 0.65,
            Self::WritingOutputs => 0.15,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Filtering => 0.05,
            Self::WindowDerivation => 0.20,
            Self::TypeCasting => 0.35,
            Self::IndicatorDerivation => 0.50,
            Self::LoadingVocabularies => 0.0,
            Self::TaxonomyCheck => 0.20,
            Self::WritingOutputs => 0.85,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// Progress update emitted between pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Optional sub-stage description (e.g. "Column: policy_type")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Progress through `total` items of a stage, e.g. one taxonomy rule each.
    pub fn with_items(
        stage: PipelineStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        let mut update = Self::new(stage, stage_progress, message);
        update.sub_stage = Some(sub_stage.into());
        update
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates from a pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread together with its reporter.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
