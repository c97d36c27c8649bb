//! Taxonomy conformance checking.
//!
//! Each controlled column holds comma-separated values that must all belong
//! to the column's vocabulary. A cell is parsed into its token sequence and
//! every token is checked. Violations are data: they are collected per rule
//! and returned, never raised.

mod vocabulary;

pub use vocabulary::TaxonomyVocabulary;

use crate::config::{DuplicatePolicy, TaxonomyRule, ValidationConfig};
use crate::error::{Result, ResultExt};
use crate::utils::{split_tokens, string_values};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Separator between values of a multi-valued taxonomy cell.
pub const TOKEN_DELIMITER: char = ',';

/// Label counted for null cells in columns that require a value.
pub const MISSING_TOKEN: &str = "<missing>";

/// Parse a cell into its trimmed tokens.
///
/// A null cell is a single missing token (`None`).
pub fn parse_cell(cell: Option<&str>) -> Vec<Option<&str>> {
    match cell {
        Some(value) => split_tokens(value, &[TOKEN_DELIMITER])
            .into_iter()
            .map(Some)
            .collect(),
        None => vec![None],
    }
}

/// Violations of one taxonomy rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnViolations {
    pub column: String,
    pub vocabulary_file: String,
    /// Source row indices, position-major then in row order.
    pub rows: Vec<usize>,
    /// Unknown tokens and how often they occurred.
    pub unknown_tokens: BTreeMap<String, usize>,
}

impl ColumnViolations {
    fn new(rule: &TaxonomyRule) -> Self {
        Self {
            column: rule.column.clone(),
            vocabulary_file: rule.vocabulary_file.clone(),
            rows: Vec::new(),
            unknown_tokens: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// File name of this column's error table.
    pub fn error_file_name(&self) -> String {
        format!("error_{}.csv", self.column)
    }

    /// The full source rows behind each violation, in report order.
    pub fn error_table(&self, source: &DataFrame) -> Result<DataFrame> {
        let idx: Vec<IdxSize> = self.rows.iter().map(|&r| r as IdxSize).collect();
        let idx = IdxCa::from_vec("idx".into(), idx);
        source
            .take(&idx)
            .context(format!("selecting error rows for '{}'", self.column))
    }
}

/// Outcome of a validator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub rows_checked: usize,
    /// One entry per rule, in rule order.
    pub columns: Vec<ColumnViolations>,
}

impl ValidationReport {
    pub fn total_violations(&self) -> usize {
        self.columns.iter().map(ColumnViolations::len).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.columns.iter().all(ColumnViolations::is_empty)
    }

    /// Rules with at least one violation.
    pub fn violated(&self) -> impl Iterator<Item = &ColumnViolations> {
        self.columns.iter().filter(|c| !c.is_empty())
    }
}

/// Checks a table against the configured taxonomy rules.
pub struct TaxonomyValidator<'a> {
    config: &'a ValidationConfig,
}

impl<'a> TaxonomyValidator<'a> {
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    /// Load every rule's vocabulary. Any unreadable file is fatal.
    pub fn load_vocabularies(&self) -> Result<Vec<TaxonomyVocabulary>> {
        self.config
            .rules
            .iter()
            .map(|rule| TaxonomyVocabulary::load(&self.config.vocabulary_path(rule)))
            .collect()
    }

    /// Validate `df` against all rules.
    pub fn validate(&self, df: &DataFrame) -> Result<ValidationReport> {
        let vocabularies = self.load_vocabularies()?;
        self.validate_with(df, &vocabularies)
    }

    /// Validate `df` with vocabularies already loaded, one per rule.
    pub fn validate_with(
        &self,
        df: &DataFrame,
        vocabularies: &[TaxonomyVocabulary],
    ) -> Result<ValidationReport> {
        self.validate_each(df, vocabularies, |_, _| {})
    }

    /// Like [`validate_with`](Self::validate_with), calling `on_rule` with
    /// the rule index after each column is checked.
    pub fn validate_each<F>(
        &self,
        df: &DataFrame,
        vocabularies: &[TaxonomyVocabulary],
        mut on_rule: F,
    ) -> Result<ValidationReport>
    where
        F: FnMut(usize, &ColumnViolations),
    {
        info!(
            "Validating {} records against {} taxonomy rules...",
            df.height(),
            self.config.rules.len()
        );

        let mut report = ValidationReport {
            rows_checked: df.height(),
            columns: Vec::with_capacity(self.config.rules.len()),
        };
        for (i, (rule, vocabulary)) in self.config.rules.iter().zip(vocabularies).enumerate() {
            let violations = check_column(df, rule, vocabulary, self.config.duplicate_policy)?;
            if violations.is_empty() {
                debug!("'{}' conforms to its taxonomy", rule.column);
            } else {
                warn!(
                    "'{}': {} violation(s), {} distinct unknown value(s)",
                    rule.column,
                    violations.len(),
                    violations.unknown_tokens.len()
                );
            }
            on_rule(i, &violations);
            report.columns.push(violations);
        }
        Ok(report)
    }
}

/// Check one column against its vocabulary.
///
/// Positions are visited in order and, within a position, rows in order.
/// Rows shorter than the position are skipped.
pub fn check_column(
    df: &DataFrame,
    rule: &TaxonomyRule,
    vocabulary: &TaxonomyVocabulary,
    policy: DuplicatePolicy,
) -> Result<ColumnViolations> {
    let cells = string_values(df, &rule.column)?;
    let parsed: Vec<Vec<Option<&str>>> = cells.iter().map(|c| parse_cell(c.as_deref())).collect();
    let max_tokens = parsed.iter().map(Vec::len).max().unwrap_or(0);

    let mut violations = ColumnViolations::new(rule);
    let mut reported: HashSet<usize> = HashSet::new();

    for position in 0..max_tokens {
        for (row, tokens) in parsed.iter().enumerate() {
            let Some(token) = tokens.get(position) else {
                continue;
            };
            let unknown = match token {
                None if rule.allow_missing => continue,
                None => MISSING_TOKEN,
                Some(value) if vocabulary.contains(value) => continue,
                Some(value) => *value,
            };
            *violations.unknown_tokens.entry(unknown.to_string()).or_insert(0) += 1;

            if policy == DuplicatePolicy::Deduplicate && !reported.insert(row) {
                continue;
            }
            violations.rows.push(row);
        }
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn objective_vocabulary() -> TaxonomyVocabulary {
        TaxonomyVocabulary::from_lines(["Mitigation", "Adaptation"])
    }

    fn objective_frame() -> DataFrame {
        df![
            "policy_objective" => [
                Some("Mitigation, Foo"),
                Some("Mitigation"),
                Some("Bar, Baz"),
                None,
                Some("Adaptation,Mitigation"),
            ],
        ]
        .unwrap()
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell(Some("Mitigation, Foo")), vec![Some("Mitigation"), Some("Foo")]);
        assert_eq!(parse_cell(None), vec![None]);
    }

    #[test]
    fn test_position_major_order() {
        let rule = TaxonomyRule::new("policy_objective", "objective.txt");
        let violations = check_column(
            &objective_frame(),
            &rule,
            &objective_vocabulary(),
            DuplicatePolicy::PerToken,
        )
        .unwrap();

        // Position 0: rows 2 and 3 (null); position 1: rows 0 and 2.
        assert_eq!(violations.rows, vec![2, 3, 0, 2]);
        assert_eq!(violations.unknown_tokens["Foo"], 1);
        assert_eq!(violations.unknown_tokens["Bar"], 1);
        assert_eq!(violations.unknown_tokens[MISSING_TOKEN], 1);
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let rule = TaxonomyRule::new("policy_objective", "objective.txt");
        let violations = check_column(
            &objective_frame(),
            &rule,
            &objective_vocabulary(),
            DuplicatePolicy::Deduplicate,
        )
        .unwrap();
        assert_eq!(violations.rows, vec![2, 3, 0]);
        assert_eq!(violations.unknown_tokens["Baz"], 1);
    }

    #[test]
    fn test_allow_missing_skips_nulls() {
        let rule = TaxonomyRule::new("policy_objective", "objective.txt").allowing_missing();
        let violations = check_column(
            &objective_frame(),
            &rule,
            &objective_vocabulary(),
            DuplicatePolicy::PerToken,
        )
        .unwrap();
        assert!(!violations.rows.contains(&3));
        assert!(!violations.unknown_tokens.contains_key(MISSING_TOKEN));
    }

    #[test]
    fn test_error_table_holds_source_rows() {
        let df = objective_frame();
        let rule = TaxonomyRule::new("policy_objective", "objective.txt");
        let violations =
            check_column(&df, &rule, &objective_vocabulary(), DuplicatePolicy::PerToken).unwrap();

        let table = violations.error_table(&df).unwrap();
        assert_eq!(table.height(), 4);
        let objective = table.column("policy_objective").unwrap().str().unwrap();
        assert_eq!(objective.get(2), Some("Mitigation, Foo"));
        assert_eq!(violations.error_file_name(), "error_policy_objective.csv");
    }

    #[test]
    fn test_error_table_rejects_rows_outside_source() {
        let mut violations = ColumnViolations::new(&TaxonomyRule::new("policy_objective", "o.txt"));
        violations.rows = vec![10];
        let err = violations.error_table(&objective_frame()).unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().contains("policy_objective"));
    }

    #[test]
    fn test_missing_rule_column_is_fatal() {
        let df = df!["policy_type" => ["Policy"]].unwrap();
        let rule = TaxonomyRule::new("policy_objective", "objective.txt");
        let err = check_column(&df, &rule, &objective_vocabulary(), DuplicatePolicy::PerToken)
            .unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_report_totals() {
        let config = ValidationConfig::builder()
            .rules(vec![TaxonomyRule::new("policy_objective", "objective.txt")])
            .build()
            .unwrap();
        let report = TaxonomyValidator::new(&config)
            .validate_with(&objective_frame(), &[objective_vocabulary()])
            .unwrap();

        assert_eq!(report.rows_checked, 5);
        assert_eq!(report.total_violations(), 4);
        assert!(!report.is_clean());
        assert_eq!(report.violated().count(), 1);
    }
}
