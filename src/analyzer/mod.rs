//! Analyzer invocation.
//!
//! The pipeline only talks to the [`Analyzer`] trait, so tests can swap the
//! IKOS processes for canned results.

pub mod ikos;

pub use ikos::{IkosAnalyzer, IkosTools};

use crate::models::{AnalysisOutcome, ReportFormat};
use async_trait::async_trait;
use std::path::Path;

/// Runs the analysis of one target and renders its reports.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze `bitcode`, writing the result database to `database`.
    ///
    /// Failure is an expected outcome and never an error: the caller skips
    /// the target.
    async fn analyze(&self, bitcode: &Path, database: &Path) -> AnalysisOutcome;

    /// Human-readable issue list for a database, or `None` if it could not be produced.
    async fn summary(&self, database: &Path) -> Option<String>;

    /// Write a structured report for a database to `output`.
    ///
    /// Best effort: failures are logged, not returned.
    async fn generate_report(&self, database: &Path, format: ReportFormat, output: &Path);
}
