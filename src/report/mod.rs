//! Aggregate report generation.
//!
//! Per-target reports written by `ikos-report` are merged here into a
//! single JUnit XML or SARIF document for the whole run.

pub mod format;
pub mod junit;
pub mod sarif;
pub mod xml;

pub use junit::write_junit_summary;
pub use sarif::write_sarif_summary;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort an aggregation step.
///
/// A missing or unreadable per-target report makes the aggregate
/// meaningless, so none of these are recovered from.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("per-target report not found: {path}")]
    MissingReport { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: xml::XmlError,
    },

    #[error("{path}: root element has no '{attribute}' attribute")]
    MissingAttribute { path: PathBuf, attribute: String },

    #[error("{path}: attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        path: PathBuf,
        attribute: String,
        value: String,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {message}")]
    InvalidSarif { path: PathBuf, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The database path with its extension removed, e.g. `/a/x.ikosdb` -> `/a/x`.
fn database_stem(database: &Path) -> PathBuf {
    database.with_extension("")
}

/// Path of the per-target report next to a result database.
pub fn sibling_report_path(database: &Path, suffix: &str) -> PathBuf {
    let mut path: OsString = database_stem(database).into_os_string();
    path.push(".");
    path.push(suffix);
    PathBuf::from(path)
}

/// Human-readable name of a target: its executable's file name.
pub fn target_label(database: &Path) -> String {
    database_stem(database)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read a per-target report, distinguishing "missing" from "unreadable".
fn read_target_report(path: &Path) -> Result<String, ReportError> {
    if !path.is_file() {
        return Err(ReportError::MissingReport {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_output(path: &Path, content: &str) -> Result<(), ReportError> {
    std::fs::write(path, content).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_report_path() {
        assert_eq!(
            sibling_report_path(Path::new("/a/x.ikosdb"), "junit.xml"),
            PathBuf::from("/a/x.junit.xml")
        );
        assert_eq!(
            sibling_report_path(Path::new("/a/libfoo.so.ikosdb"), "sarif"),
            PathBuf::from("/a/libfoo.so.sarif")
        );
    }

    #[test]
    fn test_target_label() {
        assert_eq!(target_label(Path::new("/a/b/talker.ikosdb")), "talker");
        assert_eq!(target_label(Path::new("/a/libfoo.so.ikosdb")), "libfoo.so");
    }

    #[test]
    fn test_missing_report() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.junit.xml");
        let err = read_target_report(&path).unwrap_err();
        assert!(matches!(err, ReportError::MissingReport { .. }));
        assert!(err.to_string().contains("absent.junit.xml"));
    }
}
