//! MCP tool detection: runtime discovery, static extraction, placeholder.
//!
//! Detection is a cascade of strategies tried in a fixed order until one
//! yields a non-empty tool list:
//!
//! 1. [`RuntimeStrategy`]: run the server and ask it (`tools/list`). Most
//!    accurate but requires code execution, and it is refused when the caller
//!    is already inside a tokio runtime.
//! 2. [`StaticStrategy`]: every registered [`ToolExtractor`] pattern-matches
//!    tool declarations over the whole repository tree.
//! 3. [`PlaceholderStrategy`]: when the repository still looks like an MCP
//!    server (manifest mentions the SDK), synthesize a single `unknown` tool
//!    anchored at the repository root.
//!
//! An empty result from the whole cascade is a legal outcome, not an error:
//! attribution then routes every finding through its `dependencies`/`unknown`
//! rules.

pub mod python;
pub mod runtime;
pub mod typescript;

use std::path::{Path, PathBuf};
use std::time::Duration;

use ignore::WalkBuilder;

use crate::types::{McpTool, ToolLanguage};

pub use python::PythonExtractor;
pub use runtime::RuntimeDiscoverer;
pub use typescript::TypeScriptExtractor;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Directories never visited during static extraction or entry-point search.
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "venv",
    "__pycache__",
    "vendor",
    "dist",
    "build",
    "target",
];

/// Default wall-clock budget for the runtime discovery round trip.
pub const DEFAULT_RUNTIME_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the synthesized placeholder tool.
const PLACEHOLDER_TOOL: &str = "unknown";

// ---------------------------------------------------------------------------
// ToolExtractor
// ---------------------------------------------------------------------------

/// A per-language static tool extractor.
///
/// Implementations pattern-match one file's text for tool-declaration idioms
/// and carry the repository-level "is this an MCP server at all?" signal used
/// by the placeholder tier. Extractors hold no cross-file state.
pub trait ToolExtractor: Send + Sync {
    fn language(&self) -> ToolLanguage;

    /// File extensions (with dot) this extractor scans.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Extract zero or more tools from one file's full text.
    fn extract(&self, relative_path: &str, content: &str) -> Vec<McpTool>;

    /// Repository-level signal: does this repo depend on an MCP SDK for
    /// this extractor's ecosystem?
    fn is_mcp_server(&self, repo_root: &Path) -> bool;
}

/// The built-in extractor registry, in registration order.
pub fn default_extractors() -> Vec<Box<dyn ToolExtractor>> {
    vec![
        Box::new(PythonExtractor::new()),
        Box::new(TypeScriptExtractor::new()),
    ]
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Collect repository-relative paths of all files under `root` with one of
/// the given extensions, skipping [`SKIP_DIRS`]. Sorted so extraction visits
/// files in a deterministic order regardless of filesystem iteration.
pub fn source_files(root: &Path, extensions: &[&str]) -> Vec<String> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !SKIP_DIRS.iter().any(|skip| name == *skip)
        })
        .build();

    for entry in walker.flatten() {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions
            .iter()
            .any(|e| e.trim_start_matches('.') == ext)
        {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    files.sort();
    files
}

// ---------------------------------------------------------------------------
// DetectionStrategy
// ---------------------------------------------------------------------------

/// One tier of the detection cascade.
pub trait DetectionStrategy {
    fn name(&self) -> &'static str;

    /// Run the strategy. `None` (or an empty `Some`) means "yielded nothing,
    /// continue down the cascade".
    fn run(&self) -> Option<Vec<McpTool>>;
}

/// Try strategies in order; the first non-empty result wins.
pub fn run_cascade(strategies: &[Box<dyn DetectionStrategy + '_>]) -> Vec<McpTool> {
    for strategy in strategies {
        if let Some(tools) = strategy.run() {
            if !tools.is_empty() {
                tracing::info!(
                    strategy = strategy.name(),
                    count = tools.len(),
                    "tool detection succeeded"
                );
                return tools;
            }
        }
    }
    tracing::warn!("no tools detected by any strategy");
    Vec::new()
}

/// Tier 1: live protocol introspection of the server process.
pub struct RuntimeStrategy<'a> {
    pub repo_root: &'a Path,
    pub timeout: Duration,
    pub enabled: bool,
}

impl DetectionStrategy for RuntimeStrategy<'_> {
    fn name(&self) -> &'static str {
        "runtime"
    }

    fn run(&self) -> Option<Vec<McpTool>> {
        if !self.enabled {
            return None;
        }
        // Re-entrant scheduling is disallowed: when the caller already runs
        // inside a tokio runtime we fall straight through to static
        // extraction instead of nesting a second runtime.
        if tokio::runtime::Handle::try_current().is_ok() {
            tracing::warn!("already inside a tokio runtime, skipping runtime discovery");
            return None;
        }
        let tools = RuntimeDiscoverer::new(self.repo_root, self.timeout).discover();
        if tools.is_empty() {
            tracing::debug!("runtime discovery returned no tools");
            None
        } else {
            Some(tools)
        }
    }
}

/// Tier 2: static pattern extraction over the whole tree.
pub struct StaticStrategy<'a> {
    pub repo_root: &'a Path,
    pub extractors: &'a [Box<dyn ToolExtractor>],
}

impl DetectionStrategy for StaticStrategy<'_> {
    fn name(&self) -> &'static str {
        "static"
    }

    fn run(&self) -> Option<Vec<McpTool>> {
        let mut tools = Vec::new();
        for extractor in self.extractors {
            for rel in source_files(self.repo_root, extractor.file_extensions()) {
                // Unreadable files contribute nothing.
                let Ok(content) = std::fs::read_to_string(self.repo_root.join(&rel)) else {
                    continue;
                };
                tools.extend(extractor.extract(&rel, &content));
            }
        }
        Some(tools)
    }
}

/// Tier 3: synthesize a placeholder when the repo still looks like an MCP
/// server.
pub struct PlaceholderStrategy<'a> {
    pub repo_root: &'a Path,
    pub extractors: &'a [Box<dyn ToolExtractor>],
}

impl DetectionStrategy for PlaceholderStrategy<'_> {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    fn run(&self) -> Option<Vec<McpTool>> {
        if self
            .extractors
            .iter()
            .any(|e| e.is_mcp_server(self.repo_root))
        {
            tracing::info!("repository looks like an MCP server but no tools were detected");
            let mut tool = McpTool::new(PLACEHOLDER_TOOL, "", ToolLanguage::Unknown);
            tool.description = "MCP server with undetected tools".into();
            Some(vec![tool])
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// ToolDetector
// ---------------------------------------------------------------------------

/// Detection coordinator: owns the extractor registry and runs the cascade
/// once per scan.
pub struct ToolDetector {
    repo_root: PathBuf,
    extractors: Vec<Box<dyn ToolExtractor>>,
    use_runtime_detection: bool,
    runtime_timeout: Duration,
}

impl ToolDetector {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            extractors: default_extractors(),
            use_runtime_detection: true,
            runtime_timeout: DEFAULT_RUNTIME_TIMEOUT,
        }
    }

    pub fn with_runtime_detection(mut self, enabled: bool) -> Self {
        self.use_runtime_detection = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runtime_timeout = timeout;
        self
    }

    /// Replace the extractor registry (used by tests and embedders).
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn ToolExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Detect all tools in the repository via the three-tier cascade.
    pub fn detect(&self) -> Vec<McpTool> {
        let strategies: Vec<Box<dyn DetectionStrategy + '_>> = vec![
            Box::new(RuntimeStrategy {
                repo_root: &self.repo_root,
                timeout: self.runtime_timeout,
                enabled: self.use_runtime_detection,
            }),
            Box::new(StaticStrategy {
                repo_root: &self.repo_root,
                extractors: &self.extractors,
            }),
            Box::new(PlaceholderStrategy {
                repo_root: &self.repo_root,
                extractors: &self.extractors,
            }),
        ];
        run_cascade(&strategies)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn source_files_skips_excluded_dirs_and_sorts() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.py", "x = 1\n");
        write(&dir, "a.py", "x = 1\n");
        write(&dir, "node_modules/pkg/index.py", "x = 1\n");
        write(&dir, ".venv/lib/site.py", "x = 1\n");
        write(&dir, "src/c.py", "x = 1\n");
        write(&dir, "notes.txt", "not source\n");

        let files = source_files(dir.path(), &[".py"]);
        assert_eq!(files, vec!["a.py", "b.py", "src/c.py"]);
    }

    #[test]
    fn cascade_returns_first_non_empty_result() {
        struct Fixed(Vec<McpTool>);
        impl DetectionStrategy for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn run(&self) -> Option<Vec<McpTool>> {
                Some(self.0.clone())
            }
        }

        let strategies: Vec<Box<dyn DetectionStrategy>> = vec![
            Box::new(Fixed(vec![])),
            Box::new(Fixed(vec![McpTool::new("a", "a.py", ToolLanguage::Python)])),
            Box::new(Fixed(vec![McpTool::new("b", "b.py", ToolLanguage::Python)])),
        ];
        let tools = run_cascade(&strategies);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "a");
    }

    #[test]
    fn cascade_exhausts_to_empty() {
        struct Nothing;
        impl DetectionStrategy for Nothing {
            fn name(&self) -> &'static str {
                "nothing"
            }
            fn run(&self) -> Option<Vec<McpTool>> {
                None
            }
        }
        let strategies: Vec<Box<dyn DetectionStrategy>> = vec![Box::new(Nothing), Box::new(Nothing)];
        assert!(run_cascade(&strategies).is_empty());
    }

    #[tokio::test]
    async fn runtime_strategy_refuses_inside_tokio_runtime() {
        let dir = TempDir::new().unwrap();
        write(&dir, "server.py", "from mcp import Server\nmcp.run()\n");

        let strategy = RuntimeStrategy {
            repo_root: dir.path(),
            timeout: DEFAULT_RUNTIME_TIMEOUT,
            enabled: true,
        };
        assert!(strategy.run().is_none());
    }

    #[test]
    fn placeholder_tier_fires_on_manifest_signal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "requirements.txt", "fastmcp>=2.0\nrequests\n");

        let detector = ToolDetector::new(dir.path()).with_runtime_detection(false);
        let tools = detector.detect();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "unknown");
        assert_eq!(tools[0].file_path, "");
        assert_eq!(tools[0].line_number, 0);
        assert_eq!(tools[0].language, ToolLanguage::Unknown);
    }

    #[test]
    fn no_signal_yields_empty_tool_set() {
        let dir = TempDir::new().unwrap();
        write(&dir, "README.md", "just a repo\n");

        let detector = ToolDetector::new(dir.path()).with_runtime_detection(false);
        assert!(detector.detect().is_empty());
    }

    #[test]
    fn static_tier_orders_by_registration_then_file() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "zz.py",
            "@mcp.tool()\ndef alpha():\n    pass\n",
        );
        write(
            &dir,
            "aa.ts",
            "@Tool({ description: 'x' })\nasync function beta() {}\n",
        );

        let detector = ToolDetector::new(dir.path()).with_runtime_detection(false);
        let tools = detector.detect();
        // Python extractor registers first, so the .py result precedes the
        // .ts one even though "aa.ts" sorts earlier.
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "alpha");
        assert_eq!(tools[1].name, "beta");
    }
}
