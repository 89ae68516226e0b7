//! Python import resolution backed by tree-sitter.

use std::path::Path;

use tree_sitter::Node;

use crate::types::ToolLanguage;

use super::{ImportResolver, ResolveContext};

pub struct PythonResolver;

impl PythonResolver {
    pub fn new() -> Self {
        Self
    }

    fn collect_imports(node: Node<'_>, source: &[u8], out: &mut Vec<String>) {
        match node.kind() {
            "import_statement" => {
                // import a.b, c as d
                for i in 0..node.named_child_count() {
                    let Some(child) = node.named_child(i) else { continue };
                    let target = match child.kind() {
                        "dotted_name" => Some(child),
                        "aliased_import" => child.child_by_field_name("name"),
                        _ => None,
                    };
                    if let Some(target) = target {
                        if let Ok(text) = target.utf8_text(source) {
                            out.push(text.to_string());
                        }
                    }
                }
            }
            "import_from_statement" => {
                // from a.b import x / from .c import y
                if let Some(module) = node.child_by_field_name("module_name") {
                    let target = match module.kind() {
                        "dotted_name" => Some(module),
                        "relative_import" => (0..module.named_child_count())
                            .filter_map(|i| module.named_child(i))
                            .find(|n| n.kind() == "dotted_name"),
                        _ => None,
                    };
                    if let Some(target) = target {
                        if let Ok(text) = target.utf8_text(source) {
                            out.push(text.to_string());
                        }
                    }
                }
            }
            _ => {
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i) {
                        Self::collect_imports(child, source, out);
                    }
                }
            }
        }
    }
}

impl Default for PythonResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportResolver for PythonResolver {
    fn handles(&self, language: ToolLanguage) -> bool {
        language == ToolLanguage::Python
    }

    fn imports(&self, content: &str) -> Vec<String> {
        let mut parser = tree_sitter::Parser::new();
        if parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .is_err()
        {
            return Vec::new();
        }
        let Some(tree) = parser.parse(content, None) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        Self::collect_imports(tree.root_node(), content.as_bytes(), &mut out);
        out
    }

    /// Dotted module specs resolve against the repo root first, then the
    /// importing file's directory. Every existing candidate counts; a spec
    /// matching no file is a third-party module.
    fn resolve(&self, spec: &str, ctx: &ResolveContext<'_>) -> Vec<String> {
        let parts: Vec<&str> = spec.split('.').collect();
        if parts.is_empty() {
            return Vec::new();
        }

        let mut candidates = vec![
            format!("{}.py", parts.join("/")),
            format!("{}/__init__.py", parts.join("/")),
        ];
        if let Some((dir, _)) = ctx.current_file.rsplit_once('/') {
            if let Some(last) = parts.last() {
                candidates.push(format!("{dir}/{last}.py"));
            }
        }

        candidates
            .into_iter()
            .filter(|candidate| ctx.repo_root.join(candidate).is_file())
            .collect()
    }

    fn can_recurse(&self, path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "py")
            .unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn imports_cover_plain_aliased_and_from() {
        let resolver = PythonResolver::new();
        let imports = resolver.imports(
            "import os\nimport utils.net as net\nfrom helpers import fetch\nfrom pkg.sub import thing\n",
        );
        assert_eq!(imports, vec!["os", "utils.net", "helpers", "pkg.sub"]);
    }

    #[test]
    fn relative_import_yields_module_name() {
        let resolver = PythonResolver::new();
        let imports = resolver.imports("from .helpers import fetch\nfrom . import base\n");
        assert_eq!(imports, vec!["helpers"]);
    }

    #[test]
    fn resolve_prefers_root_relative_module() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("utils")).unwrap();
        std::fs::write(dir.path().join("utils/net.py"), "").unwrap();

        let resolver = PythonResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "server.py",
        };
        assert_eq!(resolver.resolve("utils.net", &ctx), vec!["utils/net.py"]);
    }

    #[test]
    fn resolve_falls_back_to_package_init() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/__init__.py"), "").unwrap();

        let resolver = PythonResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "server.py",
        };
        assert_eq!(resolver.resolve("pkg", &ctx), vec!["pkg/__init__.py"]);
    }

    #[test]
    fn resolve_sibling_of_importing_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/app")).unwrap();
        std::fs::write(dir.path().join("src/app/helpers.py"), "").unwrap();

        let resolver = PythonResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/app/server.py",
        };
        assert_eq!(resolver.resolve("helpers", &ctx), vec!["src/app/helpers.py"]);
    }

    #[test]
    fn resolve_keeps_every_existing_candidate() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/app")).unwrap();
        std::fs::write(dir.path().join("helpers.py"), "").unwrap();
        std::fs::write(dir.path().join("src/app/helpers.py"), "").unwrap();

        let resolver = PythonResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/app/server.py",
        };
        assert_eq!(
            resolver.resolve("helpers", &ctx),
            vec!["helpers.py", "src/app/helpers.py"]
        );
    }

    #[test]
    fn third_party_module_resolves_to_nothing() {
        let dir = TempDir::new().unwrap();
        let resolver = PythonResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "server.py",
        };
        assert!(resolver.resolve("requests", &ctx).is_empty());
    }
}
