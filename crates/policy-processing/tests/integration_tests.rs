//! Integration tests for the cleaning and taxonomy validation pipelines.
//!
//! These tests run both pipelines end to end on the fixture database under
//! `tests/fixtures/`.

use policy_processing::{
    DuplicatePolicy, Pipeline, PipelineConfig, PipelineStage, PolicyError, ValidationConfig,
    ValidationPipeline, load_policy_csv,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_policies() -> DataFrame {
    load_policy_csv(&fixtures_path().join("policies.csv")).expect("Failed to read fixture")
}

fn cleaning_config(output_dir: &Path) -> PipelineConfig {
    PipelineConfig::builder()
        .output_dir(output_dir)
        .build()
        .unwrap()
}

fn validation_config(output_dir: &Path) -> ValidationConfig {
    ValidationConfig::builder()
        .taxonomy_dir(fixtures_path().join("taxonomies"))
        .output_dir(output_dir)
        .build()
        .unwrap()
}

fn clean(df: DataFrame) -> DataFrame {
    Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .build()
        .unwrap()
        .process(df)
        .unwrap()
        .data
}

fn countries(df: &DataFrame) -> Vec<String> {
    df.column("policy_country")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

fn row_of(df: &DataFrame, country: &str) -> usize {
    countries(df)
        .iter()
        .position(|c| c == country)
        .unwrap_or_else(|| panic!("{} not in cleaned table", country))
}

fn flag(df: &DataFrame, column: &str, row: usize) -> bool {
    df.column(column).unwrap().bool().unwrap().get(row).unwrap()
}

fn score(df: &DataFrame, column: &str, row: usize) -> f64 {
    df.column(column).unwrap().f64().unwrap().get(row).unwrap()
}

fn year(df: &DataFrame, column: &str, row: usize) -> Option<i32> {
    df.column(column).unwrap().i32().unwrap().get(row)
}

// ============================================================================
// Cleaning Pipeline
// ============================================================================

#[test]
fn test_cleaning_keeps_only_resolved_national_policies() {
    let cleaned = clean(load_policies());

    // City-level, missing instrument, missing sector and ended-without-end
    // records are all gone.
    assert_eq!(countries(&cleaned), vec!["Germany", "France", "Brazil", "Kenya"]);
    let jurisdiction = cleaned.column("policy_jurisdiction").unwrap().str().unwrap();
    assert!(jurisdiction.into_iter().all(|j| j == Some("Country")));
}

#[test]
fn test_cleaning_summary_counts() {
    let dir = tempfile::tempdir().unwrap();
    let result = Pipeline::builder()
        .config(cleaning_config(dir.path()))
        .build()
        .unwrap()
        .process(load_policies())
        .unwrap();

    let summary = &result.summary;
    assert_eq!(summary.rows_before, 8);
    assert_eq!(summary.rows_out_of_scope, 3);
    assert_eq!(summary.window.dropped_without_start, 0);
    assert_eq!(summary.window.dropped_without_end, 1);
    assert_eq!(summary.rows_after, 4);
    assert_eq!(summary.rows_removed(), 4);
    // 11 kept source columns, 2 window columns, 18 flags, 2 scores
    assert_eq!(summary.columns_after, 33);
    assert_eq!(
        summary.category_levels["policy_implementation_state"],
        vec!["Ended".to_string(), "In force".to_string()]
    );
    assert!(summary.indicator_audit.is_clean());
    assert_eq!(
        summary.output_file.as_deref(),
        Some(dir.path().join("treated_policy_database.csv").as_path())
    );
}

#[test]
fn test_backend_columns_are_dropped() {
    let cleaned = clean(load_policies());
    for column in ["policy_title", "policy_objective", "impact_indicator_name_of_impact_indicator"] {
        assert!(cleaned.column(column).is_err(), "{} should be dropped", column);
    }
}

#[test]
fn test_analysis_window_is_always_resolved() {
    let cleaned = clean(load_policies());
    assert_eq!(cleaned.column("policy_start_date_analysis").unwrap().null_count(), 0);
    assert_eq!(cleaned.column("policy_end_date_analysis").unwrap().null_count(), 0);
    assert_eq!(
        cleaned.column("policy_start_date_analysis").unwrap().dtype(),
        &DataType::Int32
    );
}

#[test]
fn test_explicit_end_date_dominates_in_force_horizon() {
    let cleaned = clean(load_policies());

    let france = row_of(&cleaned, "France");
    assert_eq!(year(&cleaned, "policy_end_date_analysis", france), Some(2018));
    assert_eq!(year(&cleaned, "policy_start_date_analysis", france), Some(2012));

    let brazil = row_of(&cleaned, "Brazil");
    assert_eq!(year(&cleaned, "policy_end_date_analysis", brazil), Some(2021));
    // Decision date wins over the implementation start.
    assert_eq!(year(&cleaned, "policy_start_date_analysis", brazil), Some(2010));
}

#[test]
fn test_range_end_is_configurable() {
    let config = PipelineConfig::builder()
        .range_end(2030)
        .save_to_disk(false)
        .build()
        .unwrap();
    let cleaned = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(load_policies())
        .unwrap()
        .data;

    let germany = row_of(&cleaned, "Germany");
    assert_eq!(year(&cleaned, "policy_end_date_analysis", germany), Some(2030));
}

#[test]
fn test_feed_in_tariff_in_force() {
    let cleaned = clean(load_policies());
    let germany = row_of(&cleaned, "Germany");

    assert_eq!(year(&cleaned, "policy_start_date_analysis", germany), Some(2015));
    assert_eq!(year(&cleaned, "policy_end_date_analysis", germany), Some(2021));
    assert!(flag(&cleaned, "FiscalFinancialIncentives", germany));
    for other in [
        "DirectInvestment",
        "Market-basedInstruments",
        "CodesStandards",
        "OtherRegulatoryInstruments",
        "RDD",
        "InformationEducation",
    ] {
        assert!(!flag(&cleaned, other, germany), "{} should be false", other);
    }
    assert!(flag(&cleaned, "ElectricitySector", germany));
    assert!(!flag(&cleaned, "GeneralSector", germany));
}

#[test]
fn test_sector_indicators_and_scores() {
    let cleaned = clean(load_policies());

    let france = row_of(&cleaned, "France");
    assert!(flag(&cleaned, "BuildingsSector", france));
    assert!(flag(&cleaned, "TransportSector", france));
    assert!(flag(&cleaned, "CodesStandards", france));
    assert!((score(&cleaned, "fuzziness", france) - 0.2).abs() < 1e-9);
    assert!((score(&cleaned, "sector_specificity", france) - 0.6).abs() < 1e-9);

    let kenya = row_of(&cleaned, "Kenya");
    assert!(flag(&cleaned, "LandSector", kenya));
    assert!(flag(&cleaned, "RDD", kenya));
    assert!((score(&cleaned, "sector_specificity", kenya) - 0.9).abs() < 1e-9);
}

#[test]
fn test_general_sector_has_maximal_fuzziness() {
    let cleaned = clean(load_policies());
    let brazil = row_of(&cleaned, "Brazil");

    assert!(flag(&cleaned, "GeneralSector", brazil));
    assert!(flag(&cleaned, "Target", brazil));
    assert!(!flag(&cleaned, "PolicySupport", brazil));

    let max = cleaned
        .column("fuzziness")
        .unwrap()
        .f64()
        .unwrap()
        .max()
        .unwrap();
    assert_eq!(score(&cleaned, "fuzziness", brazil), max);
    assert_eq!(score(&cleaned, "sector_specificity", brazil), 0.0);
}

#[test]
fn test_cleaning_is_byte_identical_across_runs() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for dir in [first.path(), second.path()] {
        Pipeline::builder()
            .config(cleaning_config(dir))
            .build()
            .unwrap()
            .process_file(&fixtures_path().join("policies.csv"))
            .unwrap();
    }

    let a = fs::read(first.path().join("treated_policy_database.csv")).unwrap();
    let b = fs::read(second.path().join("treated_policy_database.csv")).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn test_unparseable_year_aborts() {
    let mut df = load_policies();
    let garbled = Series::new(
        "policy_start_date_of_implementation".into(),
        vec!["sometime"; df.height()],
    );
    df.replace("policy_start_date_of_implementation", garbled)
        .unwrap();

    let err = Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .build()
        .unwrap()
        .process(df)
        .unwrap_err();

    assert_eq!(err.error_code(), "TYPE_CAST_FAILED");
    assert!(err.is_data_error());
}

#[test]
fn test_progress_stages_reported() {
    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();

    Pipeline::builder()
        .config(PipelineConfig::builder().save_to_disk(false).build().unwrap())
        .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
        .build()
        .unwrap()
        .process(load_policies())
        .unwrap();

    let stages = stages.lock().unwrap();
    for expected in [
        PipelineStage::Filtering,
        PipelineStage::WindowDerivation,
        PipelineStage::TypeCasting,
        PipelineStage::IndicatorDerivation,
        PipelineStage::Complete,
    ] {
        assert!(stages.contains(&expected), "missing stage {:?}", expected);
    }
    assert!(!stages.contains(&PipelineStage::WritingOutputs));
}

// ============================================================================
// Taxonomy Validation
// ============================================================================

#[test]
fn test_validation_writes_error_tables_for_violated_columns_only() {
    let dir = tempfile::tempdir().unwrap();
    let result = ValidationPipeline::builder()
        .config(validation_config(dir.path()))
        .build()
        .unwrap()
        .run(&load_policies())
        .unwrap();

    let written: Vec<&str> = result.error_files.keys().map(String::as_str).collect();
    assert_eq!(
        written,
        vec![
            "impact_indicator_name_of_impact_indicator",
            "policy_objective",
            "policy_sector_name",
            "policy_type_of_policy_instrument",
        ]
    );
    for clean in ["policy_jurisdiction", "policy_type", "policy_implementation_state"] {
        let path = dir.path().join(format!("error_{}.csv", clean));
        assert!(!path.exists(), "{} should not exist", path.display());
    }
}

#[test]
fn test_mixed_objective_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let result = ValidationPipeline::builder()
        .config(validation_config(dir.path()))
        .build()
        .unwrap()
        .run(&load_policies())
        .unwrap();

    let objective = result
        .report
        .columns
        .iter()
        .find(|c| c.column == "policy_objective")
        .unwrap();
    assert_eq!(objective.rows, vec![2]);
    assert_eq!(objective.unknown_tokens.get("Foo"), Some(&1));

    let table = load_policy_csv(&dir.path().join("error_policy_objective.csv")).unwrap();
    assert_eq!(table.height(), 1);
    assert_eq!(table.width(), 14);
    let value = table.column("policy_objective").unwrap().str().unwrap().get(0);
    assert_eq!(value, Some("Mitigation, Foo"));
}

#[test]
fn test_null_impact_indicator_never_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = ValidationPipeline::builder()
        .config(validation_config(dir.path()))
        .build()
        .unwrap()
        .run(&load_policies())
        .unwrap();

    let impact = result
        .report
        .columns
        .iter()
        .find(|c| c.column == "impact_indicator_name_of_impact_indicator")
        .unwrap();
    // Only the unknown "Jobs created" value; the null cells pass.
    assert_eq!(impact.rows, vec![6]);
    assert_eq!(impact.unknown_tokens.keys().collect::<Vec<_>>(), vec!["Jobs created"]);
}

#[test]
fn test_null_required_cells_are_violations() {
    let dir = tempfile::tempdir().unwrap();
    let result = ValidationPipeline::builder()
        .config(validation_config(dir.path()))
        .build()
        .unwrap()
        .run(&load_policies())
        .unwrap();

    let instrument = result
        .report
        .columns
        .iter()
        .find(|c| c.column == "policy_type_of_policy_instrument")
        .unwrap();
    assert_eq!(instrument.rows, vec![3]);

    let sector = result
        .report
        .columns
        .iter()
        .find(|c| c.column == "policy_sector_name")
        .unwrap();
    assert_eq!(sector.rows, vec![7]);
}

#[test]
fn test_clean_rerun_removes_stale_error_table() {
    let dir = tempfile::tempdir().unwrap();
    let stale = dir.path().join("error_policy_type.csv");
    fs::write(&stale, "policy_type\nUnknown\n").unwrap();

    ValidationPipeline::builder()
        .config(validation_config(dir.path()))
        .build()
        .unwrap()
        .run(&load_policies())
        .unwrap();

    assert!(!stale.exists());
}

#[test]
fn test_deduplicate_policy_reports_rows_once() {
    let df = df![
        "policy_objective" => ["Foo, Bar", "Mitigation"],
    ]
    .unwrap();
    let config = ValidationConfig::builder()
        .taxonomy_dir(fixtures_path().join("taxonomies"))
        .rules(vec![policy_processing::TaxonomyRule::new(
            "policy_objective",
            "taxonomy_policy_objective.txt",
        )])
        .duplicate_policy(DuplicatePolicy::Deduplicate)
        .save_to_disk(false)
        .build()
        .unwrap();

    let result = ValidationPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&df)
        .unwrap();

    assert_eq!(result.report.columns[0].rows, vec![0]);
    assert_eq!(result.report.columns[0].unknown_tokens.len(), 2);
}

#[test]
fn test_validation_is_byte_identical_across_runs() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for dir in [first.path(), second.path()] {
        ValidationPipeline::builder()
            .config(validation_config(dir))
            .build()
            .unwrap()
            .run_file(&fixtures_path().join("policies.csv"))
            .unwrap();
    }

    let a = fs::read(first.path().join("error_policy_objective.csv")).unwrap();
    let b = fs::read(second.path().join("error_policy_objective.csv")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_missing_taxonomy_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = ValidationConfig::builder()
        .taxonomy_dir(dir.path().join("nowhere"))
        .output_dir(dir.path())
        .build()
        .unwrap();

    let err = ValidationPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(&load_policies())
        .unwrap_err();

    assert!(matches!(err, PolicyError::VocabularyLoadFailed { .. }));
}
