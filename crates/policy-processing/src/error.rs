//! Custom error types for the policy processing pipelines.
//!
//! Fatal conditions (broken upstream invariants, malformed numeric cells,
//! missing columns) are modelled here. Taxonomy violations are never errors:
//! they are returned as data by the validator.
//!
//! Errors serialize as `{ code, message }` so a run summary can carry them.

use crate::config::ConfigValidationError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the policy processing pipelines.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// Column was not found in the source table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// A numeric cell could not be parsed after trimming.
    #[error("Failed to cast column '{column}' to {target_type} at row {row}: '{value}'")]
    TypeCastFailed {
        column: String,
        target_type: String,
        row: usize,
        value: String,
    },

    /// A derived analysis date is still unresolved after derivation.
    #[error("{rows} record(s) have an unresolved '{column}' after window derivation")]
    UnresolvedWindow { column: String, rows: usize },

    /// A taxonomy vocabulary file could not be loaded.
    #[error("Failed to load vocabulary '{}': {reason}", path.display())]
    VocabularyLoadFailed { path: PathBuf, reason: String },

    /// Row filtering or window derivation failed.
    #[error("Failed to clean data: {0}")]
    CleaningFailed(String),

    /// Writing an output table or summary failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PolicyError>,
    },
}

impl PolicyError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PolicyError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, preserved through context wrapping.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::TypeCastFailed { .. } => "TYPE_CAST_FAILED",
            Self::UnresolvedWindow { .. } => "UNRESOLVED_WINDOW",
            Self::VocabularyLoadFailed { .. } => "VOCABULARY_LOAD_FAILED",
            Self::CleaningFailed(_) => "CLEANING_FAILED",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the error signals malformed source data rather than an
    /// environment or configuration problem.
    pub fn is_data_error(&self) -> bool {
        match self {
            Self::TypeCastFailed { .. } | Self::UnresolvedWindow { .. } => true,
            Self::WithContext { source, .. } => source.is_data_error(),
            _ => false,
        }
    }
}

impl Serialize for PolicyError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PolicyError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for policy processing operations.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PolicyError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PolicyError::ColumnNotFound("policy_sector_name".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        let err = PolicyError::UnresolvedWindow {
            column: "policy_end_date_analysis".to_string(),
            rows: 2,
        };
        assert_eq!(err.error_code(), "UNRESOLVED_WINDOW");
    }

    #[test]
    fn test_is_data_error() {
        let cast = PolicyError::TypeCastFailed {
            column: "policy_date_of_decision".to_string(),
            target_type: "Int32".to_string(),
            row: 3,
            value: "soon".to_string(),
        };
        assert!(cast.is_data_error());
        assert!(cast.with_context("While casting").is_data_error());
        assert!(!PolicyError::CleaningFailed("x".to_string()).is_data_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PolicyError::ColumnNotFound("policy_jurisdiction".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("policy_jurisdiction"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: PolicyError = parse.into();
        assert_eq!(error.error_code(), "JSON_ERROR");
        assert!(!error.is_data_error());
    }

    #[test]
    fn test_with_context() {
        let error = PolicyError::ColumnNotFound("test".to_string()).with_context("During filtering");
        assert!(error.to_string().contains("During filtering"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}
