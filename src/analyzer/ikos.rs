//! IKOS process driver.
//!
//! Runs `ikos` to build a result database and `ikos-report` to render it.
//! The analyzer is run with `--format no`: it drops its stdout report once
//! there are more than a handful of issues, so reports always come from a
//! separate `ikos-report` call.

use super::Analyzer;
use crate::models::{AnalysisOutcome, ReportFormat};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, warn};

/// Locations and limits for the IKOS executables.
#[derive(Debug, Clone)]
pub struct IkosTools {
    /// The analyzer executable.
    pub ikos: String,
    /// The report generator executable.
    pub ikos_report: String,
    /// Upper bound on one analyzer run.
    pub timeout: Option<Duration>,
}

impl Default for IkosTools {
    fn default() -> Self {
        Self::from(&crate::config::Config::default())
    }
}

impl From<&crate::config::Config> for IkosTools {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            ikos: config.tools.ikos.clone(),
            ikos_report: config.tools.ikos_report.clone(),
            timeout: config.analysis.timeout_seconds.map(Duration::from_secs),
        }
    }
}

/// [`Analyzer`] backed by the IKOS command-line tools.
pub struct IkosAnalyzer {
    tools: IkosTools,
}

impl IkosAnalyzer {
    pub fn new(tools: IkosTools) -> Self {
        Self { tools }
    }

    async fn run(&self, program: &str, args: &[OsString]) -> std::io::Result<Output> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
    }
}

#[async_trait]
impl Analyzer for IkosAnalyzer {
    async fn analyze(&self, bitcode: &Path, database: &Path) -> AnalysisOutcome {
        let args = analysis_args(bitcode, database);
        let command_line = command_line(&self.tools.ikos, &args);
        debug!("Running {}", command_line);

        let run = self.run(&self.tools.ikos, &args);
        let result = match self.tools.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    error!(
                        "ikos analysis error: \"{}\" timed out after {}s",
                        command_line,
                        limit.as_secs()
                    );
                    return AnalysisOutcome::Failed;
                }
            },
            None => run.await,
        };

        match result {
            Ok(output) if output.status.success() => AnalysisOutcome::Success {
                database: database.to_path_buf(),
            },
            Ok(output) => {
                error!(
                    "ikos analysis error: \"{}\" exited with {}",
                    command_line, output.status
                );
                let combined = combined_output(&output);
                if !combined.trim().is_empty() {
                    error!("{}", combined.trim_end());
                }
                AnalysisOutcome::Failed
            }
            Err(e) => {
                error!("ikos analysis error: failed to run \"{}\": {}", command_line, e);
                AnalysisOutcome::Failed
            }
        }
    }

    async fn summary(&self, database: &Path) -> Option<String> {
        let args = vec![database.as_os_str().to_os_string()];

        match self.run(&self.tools.ikos_report, &args).await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                warn!(
                    "\"{}\" exited with {}",
                    command_line(&self.tools.ikos_report, &args),
                    output.status
                );
                None
            }
            Err(e) => {
                warn!("Failed to run {}: {}", self.tools.ikos_report, e);
                None
            }
        }
    }

    async fn generate_report(&self, database: &Path, format: ReportFormat, output: &Path) {
        let args = report_args(database, format, output);
        let command_line = command_line(&self.tools.ikos_report, &args);
        debug!("Running {}", command_line);

        match self.run(&self.tools.ikos_report, &args).await {
            Ok(result) if result.status.success() => {
                debug!("Wrote {} report {}", format, output.display());
            }
            Ok(result) => {
                warn!(
                    "{} report generation failed: \"{}\" exited with {}",
                    format, command_line, result.status
                );
                let combined = combined_output(&result);
                if !combined.trim().is_empty() {
                    warn!("{}", combined.trim_end());
                }
            }
            Err(e) => {
                warn!("{} report generation failed: \"{}\": {}", format, command_line, e);
            }
        }
    }
}

/// `<bitcode> -o <db> -q --format no`
fn analysis_args(bitcode: &Path, database: &Path) -> Vec<OsString> {
    vec![
        bitcode.as_os_str().to_os_string(),
        "-o".into(),
        database.as_os_str().to_os_string(),
        "-q".into(),
        "--format".into(),
        "no".into(),
    ]
}

/// `--format <fmt> --report-file <out> <db>`; the database must come last.
fn report_args(database: &Path, format: ReportFormat, output: &Path) -> Vec<OsString> {
    vec![
        "--format".into(),
        format.tool_name().into(),
        "--report-file".into(),
        output.as_os_str().to_os_string(),
        database.as_os_str().to_os_string(),
    ]
}

fn command_line(program: &str, args: &[OsString]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Captured output for the failure log: all of stdout, then all of stderr.
///
/// The two pipes are read separately, so lines from the two streams are not
/// interleaved in the order the tool wrote them.
fn combined_output(output: &Output) -> String {
    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}
