//! Semgrep source scanner adapter.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::detect::{default_extractors, source_files};
use crate::error::Result;
use crate::types::{Finding, FindingReference, Severity};

use super::{run_command_json, Scanner};

const SCAN_TIMEOUT: Duration = Duration::from_secs(600);

pub struct SemgrepScanner;

impl SemgrepScanner {
    pub fn new() -> Self {
        Self
    }

    fn map_severity(raw: &str) -> Severity {
        match raw {
            "ERROR" => Severity::High,
            "WARNING" => Severity::Medium,
            "INFO" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    pub(crate) fn parse_report(report: &Value, repo_root: &Path) -> Vec<Finding> {
        let Some(results) = report.get("results").and_then(Value::as_array) else {
            return Vec::new();
        };

        let null = Value::Null;
        let mut findings = Vec::new();
        for result in results {
            let Some(check_id) = result.get("check_id").and_then(Value::as_str) else {
                continue;
            };
            let extra = result.get("extra").unwrap_or(&null);
            let severity = extra
                .get("severity")
                .and_then(Value::as_str)
                .map(Self::map_severity)
                .unwrap_or(Severity::Medium);

            let mut finding = Finding::new(check_id, severity);
            finding.source = Some("semgrep".to_string());
            finding.identifier_type = "RULE".to_string();
            finding.rule_id = Some(check_id.to_string());
            finding.summary = extra
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            finding.confidence = extra
                .pointer("/metadata/confidence")
                .and_then(Value::as_str)
                .map(String::from);

            if let Some(path) = result.get("path").and_then(Value::as_str) {
                let relative = Path::new(path)
                    .strip_prefix(repo_root)
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_else(|_| path.to_string());
                finding.file_location = Some(relative);
            }

            let start = result.pointer("/start/line").and_then(Value::as_u64);
            let end = result.pointer("/end/line").and_then(Value::as_u64);
            if let (Some(start), Some(end)) = (start, end) {
                finding.line_range = Some(format!("{start}-{end}"));
            }

            if let Some(cwes) = extra.pointer("/metadata/cwe") {
                finding.categories = match cwes {
                    Value::String(s) => vec![s.clone()],
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect(),
                    _ => Vec::new(),
                };
            }
            if let Some(urls) = extra.pointer("/metadata/references").and_then(Value::as_array) {
                finding.references = urls
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|url| FindingReference {
                        r#type: "WEB".to_string(),
                        url: url.to_string(),
                    })
                    .collect();
            }
            findings.push(finding);
        }
        findings
    }
}

impl Default for SemgrepScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for SemgrepScanner {
    fn name(&self) -> &'static str {
        "semgrep"
    }

    /// Only worth running when the repo has source in a language we extract
    /// tools from.
    fn is_applicable(&self, repo_root: &Path) -> bool {
        default_extractors()
            .iter()
            .any(|extractor| !source_files(repo_root, extractor.file_extensions()).is_empty())
    }

    async fn scan(&self, repo_root: &Path) -> Result<Vec<Finding>> {
        let root = repo_root.to_string_lossy();
        let report = run_command_json(
            "semgrep",
            &["--config", "auto", "--json", "--quiet", root.as_ref()],
            SCAN_TIMEOUT,
        )
        .await?;
        Ok(Self::parse_report(&report, repo_root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn parses_result_with_location_and_metadata() {
        let report = json!({
            "results": [{
                "check_id": "python.lang.security.dangerous-eval",
                "path": "/repo/src/app.py",
                "start": {"line": 10},
                "end": {"line": 12},
                "extra": {
                    "severity": "ERROR",
                    "message": "eval on user input",
                    "metadata": {
                        "confidence": "HIGH",
                        "cwe": ["CWE-95"],
                        "references": ["https://example.com/eval"]
                    }
                }
            }]
        });
        let findings = SemgrepScanner::parse_report(&report, Path::new("/repo"));
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.id, "python.lang.security.dangerous-eval");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.file_location.as_deref(), Some("src/app.py"));
        assert_eq!(f.line_range.as_deref(), Some("10-12"));
        assert_eq!(f.confidence.as_deref(), Some("HIGH"));
        assert_eq!(f.categories, vec!["CWE-95"]);
        assert_eq!(f.references.len(), 1);
    }

    #[test_case("ERROR", Severity::High ; "error_high")]
    #[test_case("WARNING", Severity::Medium ; "warning_medium")]
    #[test_case("INFO", Severity::Low ; "info_low")]
    #[test_case("EXPERIMENT", Severity::Medium ; "unknown_medium")]
    fn severity_mapping(raw: &str, expected: Severity) {
        assert_eq!(SemgrepScanner::map_severity(raw), expected);
    }

    #[test]
    fn relative_path_is_kept_as_is() {
        let report = json!({
            "results": [{
                "check_id": "rule",
                "path": "src/app.py",
                "extra": {"severity": "INFO", "message": "m"}
            }]
        });
        let findings = SemgrepScanner::parse_report(&report, Path::new("/repo"));
        assert_eq!(findings[0].file_location.as_deref(), Some("src/app.py"));
    }

    #[test]
    fn empty_report_yields_no_findings() {
        assert!(SemgrepScanner::parse_report(&json!({}), Path::new("/repo")).is_empty());
    }
}
