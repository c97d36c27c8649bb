//! Pipeline module.
//!
//! This module provides the cleaning pipeline, the taxonomy validation
//! pipeline and their progress reporting.

mod builder;
pub mod progress;
mod validation;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
pub use validation::{ValidationPipeline, ValidationPipelineBuilder};
