//! JUnit XML aggregation.
//!
//! Each analyzed target has a `<testsuite>` report next to its result
//! database. They are wrapped in one `<testsuites>` element whose counters
//! are summed from the children.

use super::format::to_pretty_string;
use super::xml::{parse_document, XmlElement};
use super::{read_target_report, sibling_report_path, target_label, write_output, ReportError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Summed counters of an aggregate report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JUnitTotals {
    pub suites: usize,
    pub tests: u64,
    pub errors: u64,
    pub failures: u64,
    pub time: f64,
}

impl JUnitTotals {
    fn add(&mut self, suite: &SuiteCounters) {
        self.suites += 1;
        self.tests += suite.tests;
        self.errors += suite.errors;
        self.failures += suite.failures;
        self.time += suite.time;
    }
}

/// Counters of one per-target `<testsuite>`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SuiteCounters {
    tests: u64,
    errors: u64,
    failures: u64,
    time: f64,
}

/// Merge the per-target JUnit reports of `databases` and write the result to `output`.
pub fn write_junit_summary(
    databases: &[PathBuf],
    suffix: &str,
    output: &Path,
    summary_name: &str,
) -> Result<JUnitTotals, ReportError> {
    let (root, totals) = aggregate_junit_reports(databases, suffix, summary_name)?;
    write_output(output, &to_pretty_string(&root))?;

    info!(
        "Wrote {} ({} suites, {} tests, {} failures)",
        output.display(),
        totals.suites,
        totals.tests,
        totals.failures
    );
    Ok(totals)
}

/// Build the `<testsuites>` element for `databases`, in the order given.
pub fn aggregate_junit_reports(
    databases: &[PathBuf],
    suffix: &str,
    summary_name: &str,
) -> Result<(XmlElement, JUnitTotals), ReportError> {
    let mut top = XmlElement::new("testsuites").with_attribute("name", summary_name);
    let mut totals = JUnitTotals::default();

    for database in databases {
        let (suite, counters) = load_target_suite(database, suffix)?;
        totals.add(&counters);
        top.push_element(suite);
    }

    top.set_attribute("tests", totals.tests.to_string());
    top.set_attribute("errors", totals.errors.to_string());
    top.set_attribute("failures", totals.failures.to_string());
    top.set_attribute("time", format_time(totals.time));

    Ok((top, totals))
}

/// Load one target's `<testsuite>`, renamed after the target and with
/// `failures` recounted from the actual `<failure>` elements.
fn load_target_suite(
    database: &Path,
    suffix: &str,
) -> Result<(XmlElement, SuiteCounters), ReportError> {
    let path = sibling_report_path(database, suffix);
    let content = read_target_report(&path)?;
    let mut suite = parse_document(&content).map_err(|source| ReportError::Parse {
        path: path.clone(),
        source,
    })?;

    // ikos-report names every suite "ikos"
    suite.set_attribute("name", target_label(database));

    // The summary attribute written by ikos-report undercounts failures
    let failures = suite.count_descendants("failure") as u64;
    if let Some(reported) = suite.attribute("failures") {
        if reported != failures.to_string() {
            debug!(
                "{}: failures attribute says {}, found {} failure elements",
                path.display(),
                reported,
                failures
            );
        }
    }
    suite.set_attribute("failures", failures.to_string());

    let counters = SuiteCounters {
        tests: required_attribute(&suite, &path, "tests")?,
        errors: required_attribute(&suite, &path, "errors")?,
        failures,
        time: required_attribute(&suite, &path, "time")?,
    };

    Ok((suite, counters))
}

fn required_attribute<T: std::str::FromStr>(
    element: &XmlElement,
    path: &Path,
    attribute: &str,
) -> Result<T, ReportError> {
    let value = element
        .attribute(attribute)
        .ok_or_else(|| ReportError::MissingAttribute {
            path: path.to_path_buf(),
            attribute: attribute.to_string(),
        })?;

    value
        .trim()
        .parse()
        .map_err(|_| ReportError::InvalidAttribute {
            path: path.to_path_buf(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        })
}

/// Render a time total as a float, always with a fractional part.
fn format_time(time: f64) -> String {
    if time.is_finite() && time.fract() == 0.0 {
        format!("{:.1}", time)
    } else {
        time.to_string()
    }
}
