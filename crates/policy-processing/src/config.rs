//! Configuration types for the cleaning pipeline and the taxonomy validator.
//!
//! Both pipelines are pure functions of (input table, configuration). The
//! configuration objects are immutable once built and carry every constant
//! the run depends on: the analysis horizon, the column lists, the indicator
//! lookup tables and the taxonomy rules.

use crate::columns;
use crate::indicators::{IndicatorTables, ScoringTables};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default analysis horizon (last year considered for policies in force).
pub const DEFAULT_RANGE_END: i32 = 2021;

const DEFAULT_IN_FORCE_STATE: &str = "In force";
const DEFAULT_JURISDICTION_SCOPE: &str = "Country";
const DEFAULT_CLEANED_OUTPUT_DIR: &str = "results/datasets";
const DEFAULT_CLEANED_OUTPUT_NAME: &str = "treated_policy_database";
const DEFAULT_TAXONOMY_DIR: &str = "data/taxonomies";
const DEFAULT_ERROR_OUTPUT_DIR: &str = "results";

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid analysis horizon: {0} (must be between 1900 and 2100)")]
    InvalidRangeEnd(i32),

    #[error("Configuration field '{0}' must not be empty")]
    EmptyField(String),

    #[error("At least one taxonomy rule is required")]
    NoTaxonomyRules,

    #[error("Column '{0}' has more than one taxonomy rule")]
    DuplicateRule(String),

    #[error("Invalid scoring table: {0}")]
    InvalidScoringTable(String),
}

// =============================================================================
// Cleaning pipeline
// =============================================================================

/// Configuration for the cleaning and indicator pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a configuration with the
/// fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use policy_processing::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .range_end(2022)
///     .output_dir("results/datasets")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Last year of the analysis; used as the end of policies still in force.
    /// Default: 2021
    pub range_end: i32,

    /// Implementation state marking a policy as still in force.
    /// Default: "In force"
    pub in_force_state: String,

    /// Jurisdiction level kept for analysis.
    /// Default: "Country"
    pub jurisdiction_scope: String,

    /// Backend-only columns dropped before analysis. Absent ones are ignored.
    pub dropped_columns: Vec<String>,

    /// Directory for the cleaned table.
    /// Default: "results/datasets"
    pub output_dir: PathBuf,

    /// File name of the cleaned table, without extension.
    /// Default: "treated_policy_database"
    pub output_name: String,

    /// Whether to write the cleaned table to disk.
    /// Default: true
    pub save_to_disk: bool,

    /// Lookup and scoring tables for the indicator engine.
    #[serde(skip)]
    pub indicator_tables: IndicatorTables,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            range_end: DEFAULT_RANGE_END,
            in_force_state: DEFAULT_IN_FORCE_STATE.to_string(),
            jurisdiction_scope: DEFAULT_JURISDICTION_SCOPE.to_string(),
            dropped_columns: columns::BACKEND_COLUMNS.iter().map(|c| c.to_string()).collect(),
            output_dir: PathBuf::from(DEFAULT_CLEANED_OUTPUT_DIR),
            output_name: DEFAULT_CLEANED_OUTPUT_NAME.to_string(),
            save_to_disk: true,
            indicator_tables: IndicatorTables::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(1900..=2100).contains(&self.range_end) {
            return Err(ConfigValidationError::InvalidRangeEnd(self.range_end));
        }
        if self.in_force_state.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("in_force_state".to_string()));
        }
        if self.jurisdiction_scope.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("jurisdiction_scope".to_string()));
        }
        if self.output_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("output_name".to_string()));
        }
        validate_scoring(&self.indicator_tables.scoring)
    }

    /// Path of the cleaned table.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.output_name))
    }
}

/// General policies must score the maximal fuzziness, and a single specific
/// sector must not score above several.
fn validate_scoring(scoring: &ScoringTables) -> Result<(), ConfigValidationError> {
    let by_count = &scoring.fuzziness_by_count;
    if !scoring.general_fuzziness.is_finite() || by_count.iter().any(|v| !v.is_finite()) {
        return Err(ConfigValidationError::InvalidScoringTable(
            "fuzziness values must be finite".to_string(),
        ));
    }
    let max = by_count.iter().copied().fold(f64::MIN, f64::max);
    if scoring.general_fuzziness < max {
        return Err(ConfigValidationError::InvalidScoringTable(format!(
            "general fuzziness {} is below the sector-count maximum {}",
            scoring.general_fuzziness, max
        )));
    }
    if by_count[2..].iter().any(|v| *v < by_count[1]) {
        return Err(ConfigValidationError::InvalidScoringTable(format!(
            "one-sector fuzziness {} exceeds a multi-sector score",
            by_count[1]
        )));
    }
    Ok(())
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    range_end: Option<i32>,
    in_force_state: Option<String>,
    jurisdiction_scope: Option<String>,
    dropped_columns: Option<Vec<String>>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    save_to_disk: Option<bool>,
    indicator_tables: Option<IndicatorTables>,
}

impl PipelineConfigBuilder {
    /// Set the analysis horizon.
    pub fn range_end(mut self, year: i32) -> Self {
        self.range_end = Some(year);
        self
    }

    /// Set the implementation state that means "still in force".
    pub fn in_force_state(mut self, state: impl Into<String>) -> Self {
        self.in_force_state = Some(state.into());
        self
    }

    /// Set the jurisdiction level kept for analysis.
    pub fn jurisdiction_scope(mut self, scope: impl Into<String>) -> Self {
        self.jurisdiction_scope = Some(scope.into());
        self
    }

    /// Replace the list of dropped backend columns.
    pub fn dropped_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dropped_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the output directory for the cleaned table.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable writing the cleaned table.
    ///
    /// When false the cleaned table is only returned in memory.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Use alternate indicator lookup and scoring tables.
    pub fn indicator_tables(mut self, tables: IndicatorTables) -> Self {
        self.indicator_tables = Some(tables);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            range_end: self.range_end.unwrap_or(defaults.range_end),
            in_force_state: self.in_force_state.unwrap_or(defaults.in_force_state),
            jurisdiction_scope: self.jurisdiction_scope.unwrap_or(defaults.jurisdiction_scope),
            dropped_columns: self.dropped_columns.unwrap_or(defaults.dropped_columns),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            output_name: self.output_name.unwrap_or(defaults.output_name),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
            indicator_tables: self.indicator_tables.unwrap_or(defaults.indicator_tables),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Taxonomy validator
// =============================================================================

/// How rows failing at several token positions are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DuplicatePolicy {
    /// Once per failing token position (matches the historical reports).
    #[default]
    PerToken,
    /// Once per row, at its first failing position.
    Deduplicate,
}

/// One controlled column and the vocabulary file it is checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyRule {
    pub column: String,
    pub vocabulary_file: String,
    /// Null cells are legitimate for this column and never reported.
    #[serde(default)]
    pub allow_missing: bool,
}

impl TaxonomyRule {
    pub fn new(column: impl Into<String>, vocabulary_file: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            vocabulary_file: vocabulary_file.into(),
            allow_missing: false,
        }
    }

    pub fn allowing_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }
}

/// The taxonomy rules of the policy database, in report order.
pub fn default_taxonomy_rules() -> Vec<TaxonomyRule> {
    vec![
        TaxonomyRule::new(columns::JURISDICTION, "taxonomy_policy_jurisdiction.txt"),
        TaxonomyRule::new(columns::INSTRUMENT_TYPE, "taxonomy_policy_instrument.txt"),
        TaxonomyRule::new(columns::SECTOR_NAME, "taxonomy_sector.txt"),
        TaxonomyRule::new(columns::POLICY_TYPE, "taxonomy_policy_type.txt"),
        TaxonomyRule::new(columns::IMPLEMENTATION_STATE, "taxonomy_implementation_state.txt"),
        TaxonomyRule::new(columns::OBJECTIVE, "taxonomy_policy_objective.txt"),
        TaxonomyRule::new(columns::IMPACT_INDICATOR_NAME, "taxonomy_impact_indicator.txt")
            .allowing_missing(),
    ]
}

/// Configuration for the taxonomy validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory holding the vocabulary files.
    /// Default: "data/taxonomies"
    pub taxonomy_dir: PathBuf,

    /// Directory for the per-column error tables.
    /// Default: "results"
    pub output_dir: PathBuf,

    /// Rules checked in order.
    pub rules: Vec<TaxonomyRule>,

    /// Reporting of rows failing at several token positions.
    /// Default: PerToken
    pub duplicate_policy: DuplicatePolicy,

    /// Whether to write error tables to disk.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            taxonomy_dir: PathBuf::from(DEFAULT_TAXONOMY_DIR),
            output_dir: PathBuf::from(DEFAULT_ERROR_OUTPUT_DIR),
            rules: default_taxonomy_rules(),
            duplicate_policy: DuplicatePolicy::default(),
            save_to_disk: true,
        }
    }
}

impl ValidationConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ValidationConfigBuilder {
        ValidationConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.rules.is_empty() {
            return Err(ConfigValidationError::NoTaxonomyRules);
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.column.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField("rules.column".to_string()));
            }
            if rule.vocabulary_file.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField(
                    "rules.vocabulary_file".to_string(),
                ));
            }
            if self.rules[..i].iter().any(|r| r.column == rule.column) {
                return Err(ConfigValidationError::DuplicateRule(rule.column.clone()));
            }
        }
        Ok(())
    }

    /// Path of a rule's vocabulary file.
    pub fn vocabulary_path(&self, rule: &TaxonomyRule) -> PathBuf {
        self.taxonomy_dir.join(&rule.vocabulary_file)
    }
}

/// Builder for [`ValidationConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ValidationConfigBuilder {
    taxonomy_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    rules: Option<Vec<TaxonomyRule>>,
    duplicate_policy: Option<DuplicatePolicy>,
    save_to_disk: Option<bool>,
}

impl ValidationConfigBuilder {
    /// Set the directory holding the vocabulary files.
    pub fn taxonomy_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.taxonomy_dir = Some(path.into());
        self
    }

    /// Set the directory for error tables.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Replace the taxonomy rules.
    pub fn rules(mut self, rules: Vec<TaxonomyRule>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set how rows failing at several positions are reported.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = Some(policy);
        self
    }

    /// Enable or disable writing error tables.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ValidationConfig, ConfigValidationError> {
        let defaults = ValidationConfig::default();
        let config = ValidationConfig {
            taxonomy_dir: self.taxonomy_dir.unwrap_or(defaults.taxonomy_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            rules: self.rules.unwrap_or(defaults.rules),
            duplicate_policy: self.duplicate_policy.unwrap_or(defaults.duplicate_policy),
            save_to_disk: self.save_to_disk.unwrap_or(defaults.save_to_disk),
        };

        config.validate()?;
        Ok(config)
    }
}
