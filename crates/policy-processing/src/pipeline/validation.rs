//! Taxonomy validation pipeline.

use crate::config::ValidationConfig;
use crate::error::Result;
use crate::io::load_policy_csv;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::reporting::ReportWriter;
use crate::taxonomy::TaxonomyValidator;
use crate::types::ValidationResult;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Checks the raw policy table against the taxonomy rules and writes one
/// error table per violated column.
///
/// ```rust,ignore
/// use policy_processing::{ValidationConfig, ValidationPipeline};
///
/// let result = ValidationPipeline::builder()
///     .config(ValidationConfig::builder().taxonomy_dir("data/taxonomies").build()?)
///     .build()?
///     .run(&df)?;
/// ```
pub struct ValidationPipeline {
    config: ValidationConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    writer: ReportWriter,
}

static_assertions::assert_impl_all!(ValidationPipeline: Send);

impl ValidationPipeline {
    pub fn builder() -> ValidationPipelineBuilder {
        ValidationPipelineBuilder::default()
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Load the policy CSV at `path` and validate it.
    pub fn run_file(&self, path: &Path) -> Result<ValidationResult> {
        let df = load_policy_csv(path)?;
        self.run(&df)
    }

    pub fn run(&self, df: &DataFrame) -> Result<ValidationResult> {
        match self.run_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Validation completed"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Validation error: {}", e);
                Err(e)
            }
        }
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, df: &DataFrame) -> Result<ValidationResult> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::LoadingVocabularies,
            0.0,
            "Loading taxonomy vocabularies...",
        ));
        info!(
            "Loading {} vocabularies from {}",
            self.config.rules.len(),
            self.config.taxonomy_dir.display()
        );
        let validator = TaxonomyValidator::new(&self.config);
        let vocabularies = validator.load_vocabularies()?;

        let total = self.config.rules.len();
        let report = validator.validate_each(df, &vocabularies, |i, violations| {
            self.report_progress(ProgressUpdate::with_items(
                PipelineStage::TaxonomyCheck,
                format!("Column: {}", violations.column),
                i + 1,
                total,
                format!("{}: {} violation(s)", violations.column, violations.len()),
            ));
        })?;

        let error_files = if self.config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::WritingOutputs,
                0.0,
                "Writing error tables...",
            ));
            self.writer.write_error_tables(&report, df)?
        } else {
            BTreeMap::new()
        };

        info!(
            "Validation complete: {} violation(s) across {} column(s)",
            report.total_violations(),
            report.violated().count()
        );
        Ok(ValidationResult {
            report,
            error_files,
        })
    }
}

/// Builder for [`ValidationPipeline`].
#[derive(Default)]
pub struct ValidationPipelineBuilder {
    config: Option<ValidationConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

impl ValidationPipelineBuilder {
    pub fn config(mut self, config: ValidationConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    pub fn build(self) -> Result<ValidationPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let writer = ReportWriter::new(config.output_dir.clone());

        Ok(ValidationPipeline {
            config,
            progress_reporter: self.progress_reporter,
            writer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaxonomyRule;
    use std::fs;
    use std::sync::Mutex;

    fn setup(dir: &Path) -> ValidationConfig {
        let taxonomy_dir = dir.join("taxonomies");
        fs::create_dir_all(&taxonomy_dir).unwrap();
        fs::write(taxonomy_dir.join("type.txt"), "Policy\nPlan\n").unwrap();
        fs::write(taxonomy_dir.join("objective.txt"), "Mitigation\nAdaptation\n").unwrap();

        ValidationConfig::builder()
            .taxonomy_dir(taxonomy_dir)
            .output_dir(dir.join("results"))
            .rules(vec![
                TaxonomyRule::new("policy_type", "type.txt"),
                TaxonomyRule::new("policy_objective", "objective.txt"),
            ])
            .build()
            .unwrap()
    }

    fn policies() -> DataFrame {
        df![
            "policy_type" => ["Policy", "Plan"],
            "policy_objective" => ["Mitigation, Foo", "Adaptation"],
        ]
        .unwrap()
    }

    #[test]
    fn test_run_writes_only_violated_columns() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let result = ValidationPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&policies())
            .unwrap();

        assert_eq!(result.report.total_violations(), 1);
        assert!(result.error_files.contains_key("policy_objective"));
        assert!(!dir.path().join("results/error_policy_type.csv").exists());
        assert!(dir.path().join("results/error_policy_objective.csv").exists());
    }

    #[test]
    fn test_progress_per_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path());
        config.save_to_disk = false;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let result = ValidationPipeline::builder()
            .config(config)
            .on_progress(move |update| {
                if let Some(sub_stage) = update.sub_stage {
                    seen_clone.lock().unwrap().push(sub_stage);
                }
            })
            .build()
            .unwrap()
            .run(&policies())
            .unwrap();

        assert!(result.error_files.is_empty());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Column: policy_type".to_string(), "Column: policy_objective".to_string()]
        );
    }

    #[test]
    fn test_build_rejects_config_without_rules() {
        let mut config = ValidationConfig::default();
        config.rules.clear();
        let err = ValidationPipeline::builder().config(config).build().err().unwrap();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_missing_vocabulary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = ValidationConfig::builder()
            .taxonomy_dir(dir.path())
            .rules(vec![TaxonomyRule::new("policy_type", "absent.txt")])
            .save_to_disk(false)
            .build()
            .unwrap();

        let err = ValidationPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .run(&policies())
            .unwrap_err();
        assert_eq!(err.error_code(), "VOCABULARY_LOAD_FAILED");
    }
}
