//! dbrecon CLI - Cross-database row reconciliation.

mod input;

use chrono::Utc;
use clap::{Parser, Subcommand};
use dbrecon::{
    CompareMode, ComparisonOutcome, ComparisonStatus, Config, DialectCatalog, ReconError,
    Reconciler, RunSummary, Side,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

/// Exit code of a comparison whose score exceeded the tolerance.
const EXIT_COMPARISON_FAILED: u8 = 8;

#[derive(Parser)]
#[command(name = "dbrecon")]
#[command(about = "Cross-database row reconciliation and discrepancy scoring")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "recon.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the source and target row dumps
    Compare {
        /// Override the tolerance percentage
        #[arg(long)]
        tolerance: Option<f64>,

        /// Override the comparison mode: sample or counts
        #[arg(long)]
        mode: Option<String>,
    },

    /// Validate the configuration without comparing
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => match status {
            ComparisonStatus::Failed => ExitCode::from(EXIT_COMPARISON_FAILED),
            ComparisonStatus::Success | ComparisonStatus::Skipped => ExitCode::SUCCESS,
        },
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<ComparisonStatus, ReconError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| ReconError::Config(e.to_string()))?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::CheckConfig => {
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Configuration OK");
                println!("  Source: {}", config.source.label());
                println!("  Target: {}", config.target.label());
                println!("  Mode: {}", config.comparison.mode);
                println!("  Config hash: {}", config.hash());
            }
            Ok(ComparisonStatus::Success)
        }

        Commands::Compare { tolerance, mode } => {
            // Apply overrides
            if let Some(t) = tolerance {
                config.comparison.tolerance_percentage = t;
            }
            if let Some(m) = mode {
                config.comparison.mode = m.parse::<CompareMode>()?;
            }
            config.validate()?;
            let config = config.with_auto_tuning();

            let base_dir = config_dir(&cli.config);
            compare(&config, &base_dir, cli.output_json).await
        }
    }
}

async fn compare(
    config: &Config,
    base_dir: &Path,
    output_json: bool,
) -> Result<ComparisonStatus, ReconError> {
    let started_at = Utc::now();
    let cmp = &config.comparison;

    let reconciler = Reconciler::from_catalog(
        &DialectCatalog::with_builtins(),
        &config.source.dialect,
        &config.target.dialect,
        cmp.comparator_options()?,
    )?
    .with_labels(config.source.label(), config.target.label());

    let (source, target) = tokio::try_join!(
        input::load_side_blocking(Side::Source, config.source.clone(), base_dir.to_path_buf()),
        input::load_side_blocking(Side::Target, config.target.clone(), base_dir.to_path_buf()),
    )?;

    let outcome: ComparisonOutcome = match cmp.mode {
        CompareMode::Sample => {
            reconciler.compare_rows(&source, &target, &cmp.key_spec(), &cmp.selection())?
        }
        CompareMode::Counts => {
            let date_column = cmp.date_column.as_deref().ok_or_else(|| {
                ReconError::Config("comparison.date_column is required in counts mode".into())
            })?;
            reconciler.compare_counts_by_column(&source, &target, date_column)?
        }
    };

    let status = outcome.status();
    if output_json {
        let summary = RunSummary::new(cmp.mode.to_string(), config.hash(), started_at, &outcome);
        println!("{}", summary.to_json()?);
    } else if let Some(report) = outcome.report() {
        println!("{}", report);
    }

    Ok(status)
}

/// Directory the dump paths are relative to.
fn config_dir(config: &Path) -> PathBuf {
    match config.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout carries only the report or JSON summary
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
