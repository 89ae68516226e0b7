//! External scanner adapters.
//!
//! Each adapter shells out to an installed tool, parses its JSON output into
//! [`Finding`] records, and degrades to an empty result when the tool is
//! missing or fails. Scanners run concurrently.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{McpVetError, Result};
use crate::types::Finding;

mod osv;
mod semgrep;
mod trivy;

pub use osv::OsvScanner;
pub use semgrep::SemgrepScanner;
pub use trivy::TrivyScanner;

#[async_trait]
pub trait Scanner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this scanner is worth running against the repository.
    fn is_applicable(&self, _repo_root: &Path) -> bool {
        true
    }

    async fn scan(&self, repo_root: &Path) -> Result<Vec<Finding>>;
}

pub fn scanner_by_name(name: &str) -> Option<Box<dyn Scanner>> {
    match name {
        "trivy" => Some(Box::new(TrivyScanner::new())),
        "osv-scanner" => Some(Box::new(OsvScanner::new())),
        "semgrep" => Some(Box::new(SemgrepScanner::new())),
        _ => None,
    }
}

pub fn all_scanner_names() -> &'static [&'static str] {
    &["trivy", "osv-scanner", "semgrep"]
}

/// Scanners applicable to a repository: dependency scanners always, the
/// source scanner only when there is source to read.
pub fn select_scanners(repo_root: &Path) -> Vec<Box<dyn Scanner>> {
    all_scanner_names()
        .iter()
        .filter_map(|name| scanner_by_name(name))
        .filter(|scanner| scanner.is_applicable(repo_root))
        .collect()
}

/// Run scanners concurrently. A failing scanner logs and contributes an
/// empty finding list rather than aborting the rest.
pub async fn run_scanners(
    scanners: &[Box<dyn Scanner>],
    repo_root: &Path,
) -> Vec<(String, Vec<Finding>)> {
    let futures = scanners.iter().map(|scanner| async move {
        let name = scanner.name().to_string();
        match scanner.scan(repo_root).await {
            Ok(findings) => {
                info!(scanner = %name, findings = findings.len(), "scan complete");
                (name, findings)
            }
            Err(err) => {
                warn!(scanner = %name, error = %err, "scan failed");
                (name, Vec::new())
            }
        }
    });
    join_all(futures).await
}

/// Invoke an external command and parse its stdout as JSON. Scanners that
/// exit non-zero but still emit a report (common when findings exist) are
/// treated as success.
pub(crate) async fn run_command_json(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<serde_json::Value> {
    debug!(program = %program, ?args, "running scanner command");
    let output = tokio::time::timeout(timeout, Command::new(program).args(args).output())
        .await
        .map_err(|_| McpVetError::Scanner(format!("{program} timed out after {timeout:?}")))?
        .map_err(|err| McpVetError::Scanner(format!("{program} failed to start: {err}")))?;

    if output.stdout.is_empty() {
        return Err(McpVetError::Scanner(format!(
            "{program} produced no output (exit {:?})",
            output.status.code()
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|err| McpVetError::Scanner(format!("{program} emitted invalid JSON: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_all_scanners() {
        for name in all_scanner_names() {
            let scanner = scanner_by_name(name);
            assert!(scanner.is_some(), "missing scanner {name}");
            assert_eq!(scanner.unwrap().name(), *name);
        }
        assert!(scanner_by_name("bandit").is_none());
    }

    #[tokio::test]
    async fn run_scanners_survives_failures() {
        struct Failing;

        #[async_trait]
        impl Scanner for Failing {
            fn name(&self) -> &'static str {
                "failing"
            }
            async fn scan(&self, _repo_root: &Path) -> Result<Vec<Finding>> {
                Err(McpVetError::Scanner("boom".into()))
            }
        }

        let scanners: Vec<Box<dyn Scanner>> = vec![Box::new(Failing)];
        let results = run_scanners(&scanners, Path::new("/tmp")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "failing");
        assert!(results[0].1.is_empty());
    }
}
