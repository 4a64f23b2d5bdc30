//! Settings read from `.ament_ikos.toml`.
//!
//! IKOS tool paths, marker scanning rules, analysis limits and per-target
//! report suffixes. Explicit command-line flags win over the file.

use crate::models::ReportSuffixes;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".ament_ikos.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// External tool locations.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Marker scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// External IKOS executables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// The analyzer.
    #[serde(default = "default_ikos")]
    pub ikos: String,

    /// The report generator.
    #[serde(default = "default_ikos_report")]
    pub ikos_report: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ikos: default_ikos(),
            ikos_report: default_ikos_report(),
        }
    }
}

fn default_ikos() -> String {
    "ikos".to_string()
}

fn default_ikos_report() -> String {
    "ikos-report".to_string()
}

/// Marker scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Extension of the marker files left by ikos-scan.
    #[serde(default = "default_marker_extension")]
    pub marker_extension: String,

    /// Directory names whose contents are never analysis targets.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            marker_extension: default_marker_extension(),
            excluded_dirs: default_excluded_dirs(),
        }
    }
}

fn default_marker_extension() -> String {
    ".ikosbin".to_string()
}

fn default_excluded_dirs() -> Vec<String> {
    // CMake compiler checks also leave marker files behind
    vec!["CMakeFiles".to_string()]
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Extension appended to the executable path to name its result database.
    #[serde(default = "default_db_extension")]
    pub db_extension: String,

    /// Number of targets analyzed concurrently.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Per-target analyzer timeout in seconds. No limit when unset.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Print the human-readable issue list for every analyzed target.
    #[serde(default = "default_true")]
    pub stdout_report: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            db_extension: default_db_extension(),
            jobs: default_jobs(),
            timeout_seconds: None,
            stdout_report: true,
        }
    }
}

fn default_db_extension() -> String {
    ".ikosdb".to_string()
}

fn default_jobs() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Per-target report file naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Suffix of the per-target JUnit XML file.
    #[serde(default = "default_junit_suffix")]
    pub junit_suffix: String,

    /// Suffix of the per-target SARIF file.
    #[serde(default = "default_sarif_suffix")]
    pub sarif_suffix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            junit_suffix: default_junit_suffix(),
            sarif_suffix: default_sarif_suffix(),
        }
    }
}

fn default_junit_suffix() -> String {
    "junit.xml".to_string()
}

fn default_sarif_suffix() -> String {
    "sarif".to_string()
}

impl ReportConfig {
    pub fn suffixes(&self) -> ReportSuffixes {
        ReportSuffixes {
            junit: self.junit_suffix.clone(),
            sarif: self.sarif_suffix.clone(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref ikos) = args.ikos {
            self.tools.ikos = ikos.clone();
        }
        if let Some(ref ikos_report) = args.ikos_report {
            self.tools.ikos_report = ikos_report.clone();
        }

        if let Some(jobs) = args.jobs {
            self.analysis.jobs = jobs;
        }
        if let Some(timeout) = args.timeout {
            self.analysis.timeout_seconds = Some(timeout);
        }
        if args.no_stdout_report {
            self.analysis.stdout_report = false;
        }
    }

    /// Reject limits that would make every target fail or stall the run.
    ///
    /// Called after `merge_with_args`, since the file is not checked by clap.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.jobs == 0 {
            bail!("analysis.jobs must be at least 1");
        }
        if self.analysis.timeout_seconds == Some(0) {
            bail!("analysis.timeout_seconds must be at least 1 second");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tools.ikos, "ikos");
        assert_eq!(config.tools.ikos_report, "ikos-report");
        assert_eq!(config.scanner.marker_extension, ".ikosbin");
        assert_eq!(config.scanner.excluded_dirs, vec!["CMakeFiles"]);
        assert_eq!(config.analysis.db_extension, ".ikosdb");
        assert_eq!(config.analysis.jobs, 1);
        assert!(config.analysis.timeout_seconds.is_none());
        assert_eq!(config.report.suffixes(), ReportSuffixes::default());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[tools]
ikos = "/opt/ikos/bin/ikos"

[scanner]
excluded_dirs = ["CMakeFiles", "_deps"]

[analysis]
jobs = 8
timeout_seconds = 600
stdout_report = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.tools.ikos, "/opt/ikos/bin/ikos");
        assert_eq!(config.tools.ikos_report, "ikos-report");
        assert_eq!(config.scanner.marker_extension, ".ikosbin");
        assert_eq!(config.scanner.excluded_dirs, vec!["CMakeFiles", "_deps"]);
        assert_eq!(config.analysis.jobs, 8);
        assert_eq!(config.analysis.timeout_seconds, Some(600));
        assert!(!config.analysis.stdout_report);
        assert_eq!(config.report.junit_suffix, "junit.xml");
    }

    #[test]
    fn test_merge_only_explicit_args() {
        let mut config: Config = toml::from_str("[analysis]\njobs = 4\ntimeout_seconds = 30").unwrap();

        let args = Args::parse_from(["ament_ikos", "build"]);
        config.merge_with_args(&args);
        assert_eq!(config.analysis.jobs, 4);
        assert_eq!(config.analysis.timeout_seconds, Some(30));
        assert!(config.analysis.stdout_report);

        let args = Args::parse_from([
            "ament_ikos",
            "build",
            "--jobs",
            "2",
            "--ikos",
            "/usr/local/bin/ikos",
            "--no-stdout-report",
        ]);
        config.merge_with_args(&args);
        assert_eq!(config.analysis.jobs, 2);
        assert_eq!(config.tools.ikos, "/usr/local/bin/ikos");
        assert!(!config.analysis.stdout_report);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config: Config = toml::from_str("[analysis]\ntimeout_seconds = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));

        let args = Args::parse_from(["ament_ikos", "build", "--timeout", "5"]);
        config.merge_with_args(&args);
        assert!(config.validate().is_ok());

        let config: Config = toml::from_str("[analysis]\njobs = 0").unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("jobs"));

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_reports_bad_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[analysis\njobs = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[tools]"));
        assert!(toml_str.contains("[scanner]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.scanner.marker_extension, ".ikosbin");
    }
}
