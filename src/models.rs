//! Data models for the IKOS pipeline.
//!
//! This module contains the structures passed between the scanner,
//! the analyzer and the report aggregators.

use serde::Deserialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One compiled analysis target, decoded from a marker file.
///
/// Marker files are written by `ikos-scan-cc` / `ikos-scan-c++` next to the
/// build outputs and are never modified here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarkerDescriptor {
    /// Bitcode file handed to the analyzer.
    #[serde(rename = "bc")]
    pub bitcode_path: PathBuf,
    /// Executable the bitcode belongs to. The result database lives next to it.
    #[serde(rename = "exe")]
    pub executable_path: PathBuf,
}

/// Errors raised while reading a marker file.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("failed to read marker file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode marker file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl MarkerDescriptor {
    /// Decode a descriptor from its JSON text.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Read and decode a marker file.
    pub fn load(path: &Path) -> Result<Self, MarkerError> {
        let content = std::fs::read_to_string(path).map_err(|source| MarkerError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| MarkerError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Path of the result database: the executable path with `db_extension` appended.
    pub fn result_database_path(&self, db_extension: &str) -> PathBuf {
        let mut path: OsString = self.executable_path.clone().into_os_string();
        path.push(db_extension);
        PathBuf::from(path)
    }
}

/// Outcome of running the analyzer on one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The analyzer exited cleanly and wrote its database.
    Success { database: PathBuf },
    /// The analyzer could not be run or exited non-zero.
    Failed,
}

/// Structured report formats understood by `ikos-report`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// JUnit XML test report.
    JUnit,
    /// SARIF security findings.
    Sarif,
}

impl ReportFormat {
    /// Value passed to `ikos-report --format`.
    pub fn tool_name(&self) -> &'static str {
        match self {
            ReportFormat::JUnit => "junit",
            ReportFormat::Sarif => "sarif",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::JUnit => write!(f, "JUnit XML"),
            ReportFormat::Sarif => write!(f, "SARIF"),
        }
    }
}

/// File suffixes used for per-target report files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSuffixes {
    pub junit: String,
    pub sarif: String,
}

impl Default for ReportSuffixes {
    fn default() -> Self {
        Self {
            junit: "junit.xml".to_string(),
            sarif: "sarif".to_string(),
        }
    }
}

impl ReportSuffixes {
    pub fn suffix_for(&self, format: ReportFormat) -> &str {
        match format {
            ReportFormat::JUnit => &self.junit,
            ReportFormat::Sarif => &self.sarif,
        }
    }
}

/// Aggregate outputs requested for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedOutputs {
    /// Destination of the merged JUnit XML report.
    pub junit: Option<PathBuf>,
    /// Destination of the merged SARIF report.
    pub sarif: Option<PathBuf>,
}

impl RequestedOutputs {
    /// Per-target formats that must be generated to satisfy this request.
    pub fn formats(&self) -> Vec<ReportFormat> {
        let mut formats = Vec::new();
        if self.junit.is_some() {
            formats.push(ReportFormat::JUnit);
        }
        if self.sarif.is_some() {
            formats.push(ReportFormat::Sarif);
        }
        formats
    }
}

/// What a pipeline run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Marker files found by the scanner.
    pub markers: usize,
    /// Targets analyzed successfully, in scan order.
    pub databases: Vec<PathBuf>,
    /// Targets whose marker could not be decoded or whose analysis failed.
    pub failed: usize,
    /// Aggregate JUnit report, if one was written.
    pub junit_written: Option<PathBuf>,
    /// Aggregate SARIF report, if one was written.
    pub sarif_written: Option<PathBuf>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.databases.len()
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
