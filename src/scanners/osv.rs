//! OSV-Scanner dependency scanner adapter.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::types::{Finding, FindingReference, FindingScore, Severity};

use super::{run_command_json, Scanner};

const SCAN_TIMEOUT: Duration = Duration::from_secs(300);

pub struct OsvScanner;

impl OsvScanner {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn parse_report(report: &Value, repo_root: &Path) -> Vec<Finding> {
        let Some(results) = report.get("results").and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        for result in results {
            let location = result
                .pointer("/source/path")
                .and_then(Value::as_str)
                .map(|path| {
                    Path::new(path)
                        .strip_prefix(repo_root)
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                        .unwrap_or_else(|_| path.to_string())
                });
            let Some(packages) = result.get("packages").and_then(Value::as_array) else {
                continue;
            };
            for package in packages {
                let Some(vulns) = package.get("vulnerabilities").and_then(Value::as_array) else {
                    continue;
                };
                for vuln in vulns {
                    if let Some(finding) = Self::parse_vulnerability(vuln, location.as_deref()) {
                        findings.push(finding);
                    }
                }
            }
        }
        findings
    }

    fn parse_vulnerability(vuln: &Value, location: Option<&str>) -> Option<Finding> {
        let id = vuln.get("id").and_then(Value::as_str)?;
        // OSV records carry severity in database_specific or a CVSS vector;
        // the adapter keeps the qualitative rating when present.
        let severity = vuln
            .pointer("/database_specific/severity")
            .and_then(Value::as_str)
            .map(Severity::from_str_loose)
            .unwrap_or(Severity::Unknown);

        let mut finding = Finding::new(id, severity);
        finding.source = Some("osv-scanner".to_string());
        finding.identifier_type = id.split('-').next().unwrap_or("OSV").to_string();
        finding.summary = vuln
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        finding.details = vuln
            .get("details")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        finding.published = vuln
            .get("published")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());
        if let Some(aliases) = vuln.get("aliases").and_then(Value::as_array) {
            finding.aliases = aliases
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
        }
        if let Some(refs) = vuln.get("references").and_then(Value::as_array) {
            finding.references = refs
                .iter()
                .filter_map(|r| {
                    Some(FindingReference {
                        r#type: r
                            .get("type")
                            .and_then(Value::as_str)
                            .unwrap_or("WEB")
                            .to_string(),
                        url: r.get("url").and_then(Value::as_str)?.to_string(),
                    })
                })
                .collect();
        }
        if let Some(scores) = vuln.get("severity").and_then(Value::as_array) {
            finding.scores = scores
                .iter()
                .filter_map(|s| {
                    Some(FindingScore {
                        r#type: s.get("type").and_then(Value::as_str)?.to_string(),
                        value: s
                            .get("score")
                            .and_then(Value::as_str)
                            .and_then(|v| v.parse::<f64>().ok())
                            .unwrap_or(0.0),
                        version: None,
                    })
                })
                .collect();
        }
        finding.file_location = location.map(String::from);
        Some(finding)
    }
}

impl Default for OsvScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for OsvScanner {
    fn name(&self) -> &'static str {
        "osv-scanner"
    }

    async fn scan(&self, repo_root: &Path) -> Result<Vec<Finding>> {
        let root = repo_root.to_string_lossy();
        let report = run_command_json(
            "osv-scanner",
            &["--format", "json", "--recursive", root.as_ref()],
            SCAN_TIMEOUT,
        )
        .await?;
        Ok(Self::parse_report(&report, repo_root))
    }
}
