//! Per-tool import closures.
//!
//! Starting from each tool's anchor file, follow local import edges until a
//! fixpoint: the resulting closure is the set of repo-relative files a
//! finding can be attributed to that tool through. Third-party imports have
//! no local resolution and simply drop out.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::types::{McpTool, ToolLanguage};

mod javascript;
mod python;

pub use javascript::JsResolver;
pub use python::PythonResolver;

/// Tool name to closure member set. BTree containers keep iteration and
/// serialization order stable across runs.
pub type ClosureMap = BTreeMap<String, BTreeSet<String>>;

pub struct ResolveContext<'a> {
    pub repo_root: &'a Path,
    /// Repo-relative path of the file whose imports are being resolved.
    pub current_file: &'a str,
}

/// One language's import extraction and resolution rules.
pub trait ImportResolver: Send + Sync {
    fn handles(&self, language: ToolLanguage) -> bool;

    /// Raw import specifiers found in a source file.
    fn imports(&self, content: &str) -> Vec<String>;

    /// Repo-relative paths a specifier resolves to, empty when the import is
    /// external or unresolvable.
    fn resolve(&self, spec: &str, ctx: &ResolveContext<'_>) -> Vec<String>;

    /// Whether a resolved file should itself be scanned for imports.
    fn can_recurse(&self, path: &str) -> bool;
}

pub struct ClosureBuilder {
    repo_root: PathBuf,
    resolvers: Vec<Box<dyn ImportResolver>>,
}

impl ClosureBuilder {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            resolvers: vec![Box::new(PythonResolver::new()), Box::new(JsResolver::new())],
        }
    }

    /// Closure for every tool. Tools anchored at an empty path (placeholder
    /// records) get a singleton closure of that empty path, which never
    /// matches a real finding location.
    pub fn build(&self, tools: &[McpTool]) -> ClosureMap {
        let mut map = ClosureMap::new();
        for tool in tools {
            let closure = self.closure_for(tool);
            debug!(tool = %tool.name, files = closure.len(), "closure built");
            map.insert(tool.name.clone(), closure);
        }
        map
    }

    fn closure_for(&self, tool: &McpTool) -> BTreeSet<String> {
        let mut closure = BTreeSet::new();
        closure.insert(tool.file_path.clone());

        let resolver = self
            .resolvers
            .iter()
            .find(|r| r.handles(tool.language));
        let Some(resolver) = resolver else {
            return closure;
        };

        let mut visited = BTreeSet::new();
        let mut worklist = vec![tool.file_path.clone()];

        while let Some(current) = worklist.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(self.repo_root.join(&current)) else {
                continue;
            };
            let ctx = ResolveContext {
                repo_root: &self.repo_root,
                current_file: &current,
            };
            for spec in resolver.imports(&content) {
                for resolved in resolver.resolve(&spec, &ctx) {
                    if closure.insert(resolved.clone()) && resolver.can_recurse(&resolved) {
                        worklist.push(resolved);
                    }
                }
            }
        }

        closure
    }
}

/// Collapse `.` and `..` segments and normalize separators to `/`.
pub(crate) fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => {}
        }
    }
    parts.join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
