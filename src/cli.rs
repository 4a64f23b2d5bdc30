//! Command-line arguments for `ament_ikos`.
//!
//! The scan directory, which aggregate reports to write, IKOS tool overrides
//! and the flags that override `.ament_ikos.toml`.

use clap::Parser;
use std::path::PathBuf;

/// ament_ikos - run IKOS over compiled targets and merge the results
///
/// Scans a build tree for the marker files left by ikos-scan-cc /
/// ikos-scan-c++, analyzes every target with IKOS and merges the per-target
/// reports into one JUnit XML and/or SARIF file.
///
/// Examples:
///   ament_ikos build/my_package
///   ament_ikos build --xunit-file ikos.xunit.xml
///   ament_ikos build --xunit-file ikos.xunit.xml --sarif-file ikos.sarif --jobs 4
///   ament_ikos --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory to scan recursively for ikos marker files
    #[arg(value_name = "DIRECTORY", default_value = ".")]
    pub directory: PathBuf,

    /// Generate an xunit-compliant XML file
    #[arg(long, value_name = "FILE")]
    pub xunit_file: Option<PathBuf>,

    /// Generate a SARIF-compliant output file
    #[arg(long, value_name = "FILE")]
    pub sarif_file: Option<PathBuf>,

    /// Path to the ikos analyzer
    #[arg(long, value_name = "PATH", env = "IKOS_BIN")]
    pub ikos: Option<String>,

    /// Path to the ikos-report tool
    #[arg(long, value_name = "PATH", env = "IKOS_REPORT_BIN")]
    pub ikos_report: Option<String>,

    /// Number of targets analyzed concurrently
    ///
    /// Results are still merged in scan order. Default: from config or 1.
    #[arg(short, long, value_name = "NUM")]
    pub jobs: Option<usize>,

    /// Per-target analyzer timeout in seconds
    ///
    /// A target that exceeds it counts as an analysis failure. Default: no limit.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not print the ikos-report issue list for each target
    #[arg(long)]
    pub no_stdout_report: bool,

    /// Exit with code 2 if any target failed analysis
    #[arg(long)]
    pub fail_on_analysis_error: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ament_ikos.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ament_ikos.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.jobs == Some(0) {
            return Err("Jobs must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // A missing directory just has no markers; a file in its place is a mistake
        if self.directory.exists() && !self.directory.is_dir() {
            return Err(format!(
                "Scan path is not a directory: {}",
                self.directory.display()
            ));
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            directory: PathBuf::from("."),
            xunit_file: None,
            sarif_file: None,
            ikos: None,
            ikos_report: None,
            jobs: None,
            timeout: None,
            no_stdout_report: false,
            fail_on_analysis_error: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "ament_ikos",
            "build/pkg",
            "--xunit-file",
            "out.xunit.xml",
            "--sarif-file",
            "out.sarif",
        ]);
        assert_eq!(args.directory, PathBuf::from("build/pkg"));
        assert_eq!(args.xunit_file, Some(PathBuf::from("out.xunit.xml")));
        assert_eq!(args.sarif_file, Some(PathBuf::from("out.sarif")));
        assert!(!args.fail_on_analysis_error);
    }

    #[test]
    fn test_directory_defaults_to_cwd() {
        let args = Args::parse_from(["ament_ikos"]);
        assert_eq!(args.directory, PathBuf::from("."));
        assert!(args.xunit_file.is_none());
    }

    #[test]
    fn test_validation_zero_jobs() {
        let mut args = make_args();
        args.jobs = Some(0);
        assert!(args.validate().is_err());
        args.jobs = Some(3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_directory_is_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "").unwrap();

        let mut args = make_args();
        args.directory = file;
        assert!(args.validate().is_err());

        args.directory = dir.path().join("missing");
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
