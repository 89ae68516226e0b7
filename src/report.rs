//! Report files written at the end of a scan.
//!
//! Three artifacts land in the output directory: `violations.json` with the
//! raw per-scanner findings, one `{scanner}-tool-violations.json` per scanner
//! with findings grouped by attribution bucket, and `tools-metadata.json`
//! describing the detected tools.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::Result;
use crate::types::{Finding, McpTool};

pub struct ReportWriter {
    output_dir: PathBuf,
    repo_label: String,
}

impl ReportWriter {
    pub fn new(output_dir: &Path, repo_root: &Path) -> Self {
        let repo_label = repo_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repository".to_string());
        Self {
            output_dir: output_dir.to_path_buf(),
            repo_label,
        }
    }

    fn write_json(&self, filename: &str, value: &serde_json::Value) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(filename);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }

    /// Raw findings per scanner, no attribution applied.
    pub fn save_violations(&self, results: &[(String, Vec<Finding>)]) -> Result<PathBuf> {
        let by_scanner: BTreeMap<&str, &Vec<Finding>> = results
            .iter()
            .map(|(name, findings)| (name.as_str(), findings))
            .collect();
        let payload = json!({
            "generated_at": Utc::now().to_rfc3339(),
            "results": { (self.repo_label.as_str()): by_scanner },
        });
        self.write_json("violations.json", &payload)
    }

    /// One scanner's findings grouped by attribution bucket.
    pub fn save_tool_violations(
        &self,
        scanner: &str,
        buckets: &BTreeMap<String, Vec<Finding>>,
    ) -> Result<PathBuf> {
        let payload = json!({ (scanner): buckets });
        self.write_json(&format!("{scanner}-tool-violations.json"), &payload)
    }

    pub fn save_tools_metadata(&self, tools: &[McpTool]) -> Result<PathBuf> {
        let payload = json!({
            "generated_at": Utc::now().to_rfc3339(),
            "repository": &self.repo_label,
            "tools": tools,
        });
        self.write_json("tools-metadata.json", &payload)
    }
}
