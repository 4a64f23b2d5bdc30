//! Scan, analyze and aggregate.
//!
//! Targets are independent, so up to `jobs` of them are analyzed at once.
//! Results are collected in scan order regardless of completion order,
//! which keeps the aggregate reports stable between runs.

use crate::analyzer::Analyzer;
use crate::models::{AnalysisOutcome, MarkerDescriptor, ReportSuffixes, RequestedOutputs, RunSummary};
use crate::report::{self, sibling_report_path, ReportError};
use crate::scanner::MarkerScanner;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Aggregate reports to write.
    pub outputs: RequestedOutputs,
    /// Name given to the aggregate reports.
    pub summary_name: String,
    /// Appended to the executable path to name its result database.
    pub db_extension: String,
    /// Targets analyzed concurrently.
    pub jobs: usize,
    /// Print each target's issue list.
    pub stdout_report: bool,
    /// Per-target report file suffixes.
    pub suffixes: ReportSuffixes,
    /// Draw a progress bar.
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            outputs: RequestedOutputs::default(),
            summary_name: "ikos".to_string(),
            db_extension: ".ikosdb".to_string(),
            jobs: 1,
            stdout_report: true,
            suffixes: ReportSuffixes::default(),
            show_progress: false,
        }
    }
}

/// The whole scan/analyze/aggregate sequence.
pub struct Pipeline<A: Analyzer> {
    analyzer: A,
    scanner: MarkerScanner,
    options: PipelineOptions,
}

impl<A: Analyzer> Pipeline<A> {
    pub fn new(analyzer: A, scanner: MarkerScanner, options: PipelineOptions) -> Self {
        Self {
            analyzer,
            scanner,
            options,
        }
    }

    /// Run the pipeline.
    ///
    /// Targets that fail analysis are logged and left out of the aggregate
    /// reports. Only an aggregation failure is returned as an error.
    pub async fn run(&self, directory: &Path) -> Result<RunSummary, ReportError> {
        let markers = self.scanner.scan();
        if markers.is_empty() {
            println!("No marker files found when scanning {}", directory.display());
            return Ok(RunSummary::default());
        }

        info!("Found {} marker files", markers.len());
        let progress = self.progress_bar(markers.len());

        let outcomes: Vec<Option<PathBuf>> = stream::iter(markers.iter())
            .map(|marker| self.process_marker(marker, &progress))
            .buffered(self.options.jobs.max(1))
            .collect()
            .await;

        progress.finish_and_clear();

        let databases: Vec<PathBuf> = outcomes.into_iter().flatten().collect();
        let mut summary = RunSummary {
            markers: markers.len(),
            failed: markers.len() - databases.len(),
            databases,
            ..RunSummary::default()
        };

        if let Some(ref output) = self.options.outputs.junit {
            report::write_junit_summary(
                &summary.databases,
                &self.options.suffixes.junit,
                output,
                &self.options.summary_name,
            )?;
            summary.junit_written = Some(output.clone());
        }

        if let Some(ref output) = self.options.outputs.sarif {
            report::write_sarif_summary(
                &summary.databases,
                &self.options.suffixes.sarif,
                output,
                &self.options.summary_name,
            )?;
            summary.sarif_written = Some(output.clone());
        }

        Ok(summary)
    }

    /// Analyze one marker's target and generate its per-target reports.
    ///
    /// Returns the result database on success.
    async fn process_marker(&self, marker_file: &Path, progress: &ProgressBar) -> Option<PathBuf> {
        let database = self.analyze_marker(marker_file).await;

        if let Some(ref database) = database {
            if self.options.stdout_report {
                if let Some(text) = self.analyzer.summary(database).await {
                    progress.suspend(|| print!("{}", text));
                }
            }

            for format in self.options.outputs.formats() {
                let output = sibling_report_path(database, self.options.suffixes.suffix_for(format));
                self.analyzer.generate_report(database, format, &output).await;
            }
        }

        progress.inc(1);
        database
    }

    async fn analyze_marker(&self, marker_file: &Path) -> Option<PathBuf> {
        let marker = match MarkerDescriptor::load(marker_file) {
            Ok(marker) => marker,
            Err(e) => {
                error!("Skipping target: {}", e);
                return None;
            }
        };

        let database = marker.result_database_path(&self.options.db_extension);
        debug!(
            "Analyzing {} -> {}",
            marker.bitcode_path.display(),
            database.display()
        );

        match self.analyzer.analyze(&marker.bitcode_path, &database).await {
            AnalysisOutcome::Success { database } => Some(database),
            AnalysisOutcome::Failed => {
                warn!(
                    "Cannot generate report for {} due to analysis failure.",
                    marker.bitcode_path.display()
                );
                None
            }
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} targets")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

/// Name of the aggregate reports for a scan directory: `<dir name>.ikos`.
///
/// Directories without a final component (`.`, `/`) are resolved first.
pub fn summary_name(directory: &Path) -> String {
    let base = directory
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .or_else(|| {
            std::fs::canonicalize(directory)
                .ok()
                .and_then(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        });

    match base {
        Some(base) => format!("{}.ikos", base),
        None => "ikos".to_string(),
    }
}
