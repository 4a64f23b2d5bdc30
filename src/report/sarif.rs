//! SARIF aggregation.
//!
//! A SARIF log is a list of runs, so merging per-target logs means
//! concatenating their runs. Each run is tagged with the target it came
//! from so viewers can tell them apart.

use super::{read_target_report, sibling_report_path, target_label, write_output, ReportError};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SARIF_VERSION: &str = "2.1.0";
pub const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";

/// Merge the per-target SARIF logs of `databases` and write the result to `output`.
///
/// Returns the number of runs written.
pub fn write_sarif_summary(
    databases: &[PathBuf],
    suffix: &str,
    output: &Path,
    summary_name: &str,
) -> Result<usize, ReportError> {
    let log = aggregate_sarif_reports(databases, suffix, summary_name)?;
    let runs = log["runs"].as_array().map(Vec::len).unwrap_or(0);

    let mut content = serde_json::to_string_pretty(&log).map_err(|source| ReportError::Json {
        path: output.to_path_buf(),
        source,
    })?;
    content.push('\n');
    write_output(output, &content)?;

    info!("Wrote {} ({} runs)", output.display(), runs);
    Ok(runs)
}

/// Build one SARIF log holding the runs of every target, in the order given.
pub fn aggregate_sarif_reports(
    databases: &[PathBuf],
    suffix: &str,
    summary_name: &str,
) -> Result<Value, ReportError> {
    let mut runs = Vec::new();

    for database in databases {
        let path = sibling_report_path(database, suffix);
        let content = read_target_report(&path)?;
        let log: Value = serde_json::from_str(&content).map_err(|source| ReportError::Json {
            path: path.clone(),
            source,
        })?;

        let target_runs = match log {
            Value::Object(mut object) => match object.remove("runs") {
                Some(Value::Array(target_runs)) => target_runs,
                _ => {
                    return Err(ReportError::InvalidSarif {
                        path,
                        message: "missing 'runs' array".to_string(),
                    })
                }
            },
            _ => {
                return Err(ReportError::InvalidSarif {
                    path,
                    message: "top-level value is not an object".to_string(),
                })
            }
        };

        let automation_id = format!("{}/{}/", summary_name, target_label(database));
        for mut run in target_runs {
            if let Value::Object(ref mut object) = run {
                tag_run(object, &automation_id);
            }
            runs.push(run);
        }
    }

    Ok(json!({
        "$schema": SARIF_SCHEMA,
        "version": SARIF_VERSION,
        "runs": runs,
    }))
}

/// Set `automationDetails.id` unless the producer already did.
fn tag_run(run: &mut Map<String, Value>, automation_id: &str) {
    let details = run
        .entry("automationDetails")
        .or_insert_with(|| Value::Object(Map::new()));

    if let Value::Object(details) = details {
        details
            .entry("id")
            .or_insert_with(|| Value::String(automation_id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TALKER: &str = include_str!("../../fixtures/talker.sarif");

    fn add_target(dir: &TempDir, name: &str, log: &str) -> PathBuf {
        fs::write(dir.path().join(format!("{}.sarif", name)), log).unwrap();
        dir.path().join(format!("{}.ikosdb", name))
    }

    #[test]
    fn test_runs_concatenated_in_order() {
        let dir = TempDir::new().unwrap();
        let two_runs = r#"{"version": "2.1.0", "runs": [
            {"tool": {"driver": {"name": "IKOS"}}, "results": []},
            {"tool": {"driver": {"name": "IKOS"}}, "results": [], "automationDetails": {"id": "custom/"}}
        ]}"#;
        let dbs = vec![
            add_target(&dir, "talker", TALKER),
            add_target(&dir, "listener", two_runs),
        ];

        let log = aggregate_sarif_reports(&dbs, "sarif", "pkg.ikos").unwrap();
        assert_eq!(log["version"], "2.1.0");
        assert_eq!(log["$schema"], SARIF_SCHEMA);

        let runs = log["runs"].as_array().unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0]["automationDetails"]["id"], "pkg.ikos/talker/");
        assert_eq!(runs[0]["results"][0]["ruleId"], "boa");
        assert_eq!(runs[1]["automationDetails"]["id"], "pkg.ikos/listener/");
        assert_eq!(runs[2]["automationDetails"]["id"], "custom/");
    }

    #[test]
    fn test_zero_targets() {
        let log = aggregate_sarif_reports(&[], "sarif", "empty.ikos").unwrap();
        assert_eq!(log["runs"], json!([]));
    }

    #[test]
    fn test_invalid_inputs_are_fatal() {
        let dir = TempDir::new().unwrap();

        let db = add_target(&dir, "noruns", r#"{"version": "2.1.0"}"#);
        let err = aggregate_sarif_reports(&[db], "sarif", "run").unwrap_err();
        assert!(matches!(err, ReportError::InvalidSarif { .. }));

        let db = add_target(&dir, "garbage", "{not json");
        let err = aggregate_sarif_reports(&[db], "sarif", "run").unwrap_err();
        assert!(matches!(err, ReportError::Json { .. }));
        assert!(err.to_string().contains("garbage.sarif"));

        let err = aggregate_sarif_reports(&[dir.path().join("absent.ikosdb")], "sarif", "run")
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingReport { .. }));
    }

    #[test]
    fn test_write_summary_file() {
        let dir = TempDir::new().unwrap();
        let db = add_target(&dir, "talker", TALKER);
        let output = dir.path().join("ikos.sarif");

        let runs = write_sarif_summary(&[db], "sarif", &output, "build.ikos").unwrap();
        assert_eq!(runs, 1);

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["runs"][0]["tool"]["driver"]["name"], "IKOS");
    }
}
