//! Partition scanner findings across tool buckets.
//!
//! Every finding lands in exactly one bucket: a tool name when the finding's
//! file is in that tool's import closure, `dependencies` for manifest and
//! lockfile hits or findings with no location, and `unknown` for files no
//! closure claims. Bucket assignment is deterministic for a given input.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::graph::ClosureMap;
use crate::types::Finding;

pub const DEPENDENCIES_BUCKET: &str = "dependencies";
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Manifest and lockfile basenames routed straight to `dependencies`,
/// regardless of closure membership.
const DEPENDENCY_MANIFESTS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "requirements.txt",
    "setup.py",
    "pyproject.toml",
    "Pipfile",
    "poetry.lock",
    "go.mod",
    "go.sum",
    "Cargo.toml",
    "Cargo.lock",
    "Gemfile",
    "Gemfile.lock",
    "composer.json",
    "composer.lock",
];

pub fn attribute_findings(
    findings: &[Finding],
    closures: &ClosureMap,
    repo_root: &Path,
) -> BTreeMap<String, Vec<Finding>> {
    let mut buckets: BTreeMap<String, Vec<Finding>> = BTreeMap::new();

    for finding in findings {
        let bucket = bucket_for(finding, closures, repo_root);
        debug!(finding = %finding.id, bucket = %bucket, "finding attributed");
        buckets.entry(bucket).or_default().push(finding.clone());
    }

    buckets
}

fn bucket_for(finding: &Finding, closures: &ClosureMap, repo_root: &Path) -> String {
    let Some(location) = finding.file_location.as_deref() else {
        return DEPENDENCIES_BUCKET.to_string();
    };

    let Some(relative) = relativize(location, repo_root) else {
        return UNKNOWN_BUCKET.to_string();
    };

    let basename = relative.rsplit('/').next().unwrap_or(&relative);
    if DEPENDENCY_MANIFESTS.contains(&basename) {
        return DEPENDENCIES_BUCKET.to_string();
    }

    // BTreeMap order makes the tie-break alphabetical by tool name.
    for (tool, closure) in closures {
        if closure.contains(&relative) {
            return tool.clone();
        }
    }

    UNKNOWN_BUCKET.to_string()
}

/// Normalize a finding location to a repo-relative path. Absolute paths
/// outside the root have no repo-relative form.
fn relativize(location: &str, repo_root: &Path) -> Option<String> {
    let path = Path::new(location);
    if path.is_absolute() {
        let relative = path.strip_prefix(repo_root).ok()?;
        return Some(crate::graph::normalize_path(relative));
    }
    Some(crate::graph::normalize_path(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
