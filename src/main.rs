//! ament_ikos - IKOS static analysis over a build tree
//!
//! Finds the marker files left by ikos-scan-cc / ikos-scan-c++, analyzes
//! each target with IKOS and merges the per-target results into JUnit XML
//! and SARIF reports.
//!
//! Exit codes:
//!   0 - Success (per-target analysis failures are logged, not fatal)
//!   1 - Runtime error (bad config, report aggregation failure, etc.)
//!   2 - Some targets failed analysis and --fail-on-analysis-error is set

mod analyzer;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;
mod scanner;

use analyzer::{IkosAnalyzer, IkosTools};
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use models::RequestedOutputs;
use pipeline::{Pipeline, PipelineOptions};
use scanner::{MarkerScanner, ScanConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("ament_ikos v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("ament_ikos failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ament_ikos.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the scan/analyze/aggregate sequence. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let scanner = MarkerScanner::new(args.directory.clone(), ScanConfig::from(&config.scanner));
    let analyzer = IkosAnalyzer::new(IkosTools::from(&config));

    let options = PipelineOptions {
        outputs: RequestedOutputs {
            junit: args.xunit_file.clone(),
            sarif: args.sarif_file.clone(),
        },
        summary_name: pipeline::summary_name(&args.directory),
        db_extension: config.analysis.db_extension.clone(),
        jobs: config.analysis.jobs,
        stdout_report: config.analysis.stdout_report,
        suffixes: config.report.suffixes(),
        show_progress: !args.quiet,
    };

    let summary = Pipeline::new(analyzer, scanner, options)
        .run(&args.directory)
        .await
        .context("Report aggregation failed")?;

    if summary.markers == 0 {
        return Ok(0);
    }

    info!(
        "Analyzed {} of {} targets ({} failed)",
        summary.succeeded(),
        summary.markers,
        summary.failed
    );
    if let Some(ref path) = summary.junit_written {
        println!("JUnit XML report saved to: {}", path.display());
    }
    if let Some(ref path) = summary.sarif_written {
        println!("SARIF report saved to: {}", path.display());
    }

    if args.fail_on_analysis_error && summary.has_failures() {
        eprintln!(
            "{} target(s) failed analysis. Failing (exit code 2).",
            summary.failed
        );
        return Ok(2);
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
