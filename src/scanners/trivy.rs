//! Trivy filesystem scanner adapter.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::types::{Finding, FindingReference, Severity};

use super::{run_command_json, Scanner};

const SCAN_TIMEOUT: Duration = Duration::from_secs(300);

pub struct TrivyScanner;

impl TrivyScanner {
    pub fn new() -> Self {
        Self
    }

    pub(crate) fn parse_report(report: &Value) -> Vec<Finding> {
        let Some(results) = report.get("Results").and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut findings = Vec::new();
        for result in results {
            let target = result.get("Target").and_then(Value::as_str);
            let Some(vulns) = result.get("Vulnerabilities").and_then(Value::as_array) else {
                continue;
            };
            for vuln in vulns {
                let Some(id) = vuln.get("VulnerabilityID").and_then(Value::as_str) else {
                    continue;
                };
                let severity = vuln
                    .get("Severity")
                    .and_then(Value::as_str)
                    .map(Severity::from_str_loose)
                    .unwrap_or(Severity::Unknown);

                let mut finding = Finding::new(id, severity);
                finding.source = Some("trivy".to_string());
                finding.identifier_type = if id.starts_with("CVE-") { "CVE" } else { "OTHER" }.to_string();
                finding.summary = vuln
                    .get("Title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                finding.details = vuln
                    .get("Description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                finding.fixed_version = vuln
                    .get("FixedVersion")
                    .and_then(Value::as_str)
                    .map(String::from);
                finding.published = vuln
                    .get("PublishedDate")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse::<DateTime<Utc>>().ok());
                if let Some(refs) = vuln.get("References").and_then(Value::as_array) {
                    finding.references = refs
                        .iter()
                        .filter_map(Value::as_str)
                        .map(|url| FindingReference {
                            r#type: "WEB".to_string(),
                            url: url.to_string(),
                        })
                        .collect();
                }
                finding.file_location = target.map(String::from);
                findings.push(finding);
            }
        }
        findings
    }
}

impl Default for TrivyScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for TrivyScanner {
    fn name(&self) -> &'static str {
        "trivy"
    }

    async fn scan(&self, repo_root: &Path) -> Result<Vec<Finding>> {
        let root = repo_root.to_string_lossy();
        let report = run_command_json(
            "trivy",
            &[
                "fs",
                "--format",
                "json",
                "--severity",
                "UNKNOWN,LOW,MEDIUM,HIGH,CRITICAL",
                root.as_ref(),
            ],
            SCAN_TIMEOUT,
        )
        .await?;
        Ok(Self::parse_report(&report))
    }
}
