//! CLI entry point for the climate policy database pipelines.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use policy_processing::{
    CleaningSummary, DuplicatePolicy, Pipeline, PipelineConfig, ReportWriter, RunReport,
    ValidationConfig, ValidationPipeline, ValidationSummary, load_policy_csv,
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Climate policy database cleaning and taxonomy validation",
    long_about = "Prepares a climate policy database for analysis.\n\n\
                  EXAMPLES:\n  \
                  # Clean the database and derive indicators\n  \
                  policy-processing clean -i data/policy_database.csv\n\n  \
                  # Use a different analysis horizon\n  \
                  policy-processing clean -i data/policy_database.csv --range-end 2023\n\n  \
                  # Check controlled columns against the taxonomies\n  \
                  policy-processing validate -i data/policy_database.csv --taxonomy-dir data/taxonomies"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the run summary.
    #[arg(long, global = true)]
    json: bool,

    /// Write the JSON run summary to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long, global = true)]
    emit_report: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean the database and derive the indicator columns
    Clean {
        /// Path to the policy database CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for the cleaned table
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Last year of the analysis for policies still in force
        #[arg(long)]
        range_end: Option<i32>,

        /// JSON file with a pipeline configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check controlled columns against their taxonomy vocabularies
    Validate {
        /// Path to the policy database CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Directory holding the vocabulary files
        #[arg(long)]
        taxonomy_dir: Option<PathBuf>,

        /// Output directory for the error tables
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report each failing row once, at its first failing value
        #[arg(long)]
        deduplicate: bool,

        /// JSON file with a validation configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.output.log_level, cli.output.quiet, cli.output.json);

    // Load environment variables from .env file
    dotenv().ok();

    match cli.command {
        Command::Clean {
            ref input,
            ref output,
            range_end,
            ref config,
        } => {
            let config = clean_config(output.as_deref(), range_end, config.as_deref())?;
            run_clean(input, config, &cli.output)
        }
        Command::Validate {
            ref input,
            ref taxonomy_dir,
            ref output,
            deduplicate,
            ref config,
        } => {
            let config = validate_config(
                taxonomy_dir.as_deref(),
                output.as_deref(),
                deduplicate,
                config.as_deref(),
            )?;
            run_validate(input, config, &cli.output)
        }
    }
}

/// Read a JSON configuration file.
fn read_json_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}

fn clean_config(
    output: Option<&Path>,
    range_end: Option<i32>,
    config_file: Option<&Path>,
) -> Result<PipelineConfig> {
    let mut config: PipelineConfig = match config_file {
        Some(path) => read_json_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = output {
        config.output_dir = dir.to_path_buf();
    }
    if let Some(year) = range_end {
        config.range_end = year;
    }
    config.validate()?;
    Ok(config)
}

fn validate_config(
    taxonomy_dir: Option<&Path>,
    output: Option<&Path>,
    deduplicate: bool,
    config_file: Option<&Path>,
) -> Result<ValidationConfig> {
    let mut config: ValidationConfig = match config_file {
        Some(path) => read_json_config(path)?,
        None => ValidationConfig::default(),
    };
    if let Some(dir) = taxonomy_dir {
        config.taxonomy_dir = dir.to_path_buf();
    }
    if let Some(dir) = output {
        config.output_dir = dir.to_path_buf();
    }
    if deduplicate {
        config.duplicate_policy = DuplicatePolicy::Deduplicate;
    }
    config.validate()?;
    Ok(config)
}

fn progress_logger(quiet: bool) -> impl Fn(policy_processing::ProgressUpdate) + Send + Sync {
    move |update| {
        if !quiet {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        }
    }
}

fn run_clean(input: &Path, config: PipelineConfig, args: &OutputArgs) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    let report_dir = config.output_dir.clone();

    let df = load_policy_csv(input)?;
    let shape = df.shape();
    info!("Dataset loaded successfully: {:?}", shape);

    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(progress_logger(args.quiet))
        .build()?;

    let result = pipeline.process(df).map_err(|e| {
        error!("Cleaning failed: {}", e);
        anyhow!("Cleaning failed: {}", e)
    })?;

    let report = RunReport::Clean {
        input_file: input.display().to_string(),
        summary: result.summary.clone(),
    };
    emit(&report, input, &report_dir, args)?;
    if !args.json {
        print_clean_summary(input, &result.summary);
    }
    Ok(())
}

fn run_validate(input: &Path, config: ValidationConfig, args: &OutputArgs) -> Result<()> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    let report_dir = config.output_dir.clone();

    let df = load_policy_csv(input)?;
    info!("Dataset loaded successfully: {:?}", df.shape());

    let pipeline = ValidationPipeline::builder()
        .config(config)
        .on_progress(progress_logger(args.quiet))
        .build()?;

    let result = pipeline.run(&df).map_err(|e| {
        error!("Validation failed: {}", e);
        anyhow!("Validation failed: {}", e)
    })?;

    let summary = result.summary();
    let report = RunReport::Validate {
        input_file: input.display().to_string(),
        summary: summary.clone(),
    };
    emit(&report, input, &report_dir, args)?;
    if !args.json {
        print_validation_summary(input, &summary);
    }
    Ok(())
}

/// Handle the `--json` and `--emit-report` flags.
fn emit(report: &RunReport, input: &Path, report_dir: &Path, args: &OutputArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    if args.emit_report {
        let stem = extract_file_stem(input);
        let path = ReportWriter::new(report_dir).write_run_report(report, &stem)?;
        info!("Report written to: {}", path.display());
    }
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of a cleaning run.
fn print_clean_summary(input: &Path, summary: &CleaningSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        input.display(),
        summary.rows_before,
        summary.columns_before
    );
    match &summary.output_file {
        Some(path) => println!(
            "Output: {} ({} rows x {} columns)",
            path.display(),
            summary.rows_after,
            summary.columns_after
        ),
        None => println!(
            "Output: not written ({} rows x {} columns)",
            summary.rows_after, summary.columns_after
        ),
    }
    println!();

    println!("Processing Summary:");
    println!(
        "  Rows: {} -> {} ({} removed)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed()
    );
    println!("  Out of scope: {}", summary.rows_out_of_scope);
    println!(
        "  Unresolved window: {} without start, {} without end",
        summary.window.dropped_without_start, summary.window.dropped_without_end
    );
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in &summary.actions {
            println!("  - {}", action);
        }
        println!();
    }

    let audit = &summary.indicator_audit;
    if !audit.is_clean() {
        println!("Unmapped Terms:");
        for (token, count) in &audit.unmapped_instrument_tokens {
            println!("  ! instrument '{}' ({}x)", token, count);
        }
        for (token, count) in &audit.unmapped_sector_tokens {
            println!("  ! sector '{}' ({}x)", token, count);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

/// Print a human-readable summary of a validation run.
fn print_validation_summary(input: &Path, summary: &ValidationSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("TAXONOMY VALIDATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input: {} ({} rows)", input.display(), summary.rows_checked);
    println!();

    println!("{:<45} {:>10}  {}", "Column", "Violations", "Error file");
    println!("{}", "-".repeat(80));
    for column in &summary.columns {
        let file = column
            .error_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<45} {:>10}  {}", column.column, column.violations, file);
    }
    println!();

    let mut unknown: Vec<(&String, &usize)> = summary
        .columns
        .iter()
        .flat_map(|c| c.unknown_tokens.iter())
        .collect();
    if !unknown.is_empty() {
        unknown.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        println!("Most frequent unknown values:");
        for (token, count) in unknown.iter().take(10) {
            println!("  ! '{}' ({}x)", token, count);
        }
        println!();
    }

    println!("Total violations: {}", summary.total_violations);
    println!("{}", "=".repeat(80));
}
