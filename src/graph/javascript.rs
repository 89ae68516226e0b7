//! JavaScript/TypeScript import resolution.
//!
//! Regex-based extraction of ES `import ... from` and CommonJS `require()`
//! specifiers, with Node-style resolution for relative paths: extension
//! probing, then `index.*` inside a directory.

use std::path::Path;

use regex::Regex;

use crate::types::ToolLanguage;

use super::{normalize_path, ImportResolver, ResolveContext};

// Bare path last: an extensionless file must not shadow the source module.
const PROBE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ""];
const INDEX_FILES: &[&str] = &["/index.ts", "/index.tsx", "/index.js", "/index.jsx"];

pub struct JsResolver {
    import_pattern: Regex,
    require_pattern: Regex,
}

impl JsResolver {
    pub fn new() -> Self {
        Self {
            import_pattern: Regex::new(r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#)
                .expect("valid import pattern"),
            require_pattern: Regex::new(r#"require\(['"]([^'"]+)['"]\)"#)
                .expect("valid require pattern"),
        }
    }
}

impl Default for JsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportResolver for JsResolver {
    fn handles(&self, language: ToolLanguage) -> bool {
        matches!(language, ToolLanguage::TypeScript | ToolLanguage::JavaScript)
    }

    fn imports(&self, content: &str) -> Vec<String> {
        let mut out = Vec::new();
        for pattern in [&self.import_pattern, &self.require_pattern] {
            for caps in pattern.captures_iter(content) {
                if let Some(spec) = caps.get(1) {
                    out.push(spec.as_str().to_string());
                }
            }
        }
        out
    }

    /// Bare specifiers are packages and never resolve locally. Relative ones
    /// resolve against the importing file's directory.
    fn resolve(&self, spec: &str, ctx: &ResolveContext<'_>) -> Vec<String> {
        if !spec.starts_with("./") && !spec.starts_with("../") {
            return Vec::new();
        }

        let current_dir = match ctx.current_file.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => "",
        };
        let base = normalize_path(&Path::new(current_dir).join(spec));
        if base.is_empty() {
            return Vec::new();
        }

        for extension in PROBE_EXTENSIONS {
            let candidate = format!("{base}{extension}");
            if ctx.repo_root.join(&candidate).is_file() {
                return vec![candidate];
            }
        }
        for index in INDEX_FILES {
            let candidate = format!("{base}{index}");
            if ctx.repo_root.join(&candidate).is_file() {
                return vec![candidate];
            }
        }
        Vec::new()
    }

    fn can_recurse(&self, path: &str) -> bool {
        [".ts", ".tsx", ".js", ".jsx"]
            .iter()
            .any(|ext| path.ends_with(ext))
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
    fn imports_cover_es_and_commonjs() {
        let resolver = JsResolver::new();
        let imports = resolver.imports(
            "import { a } from './utils';\nimport fs from 'fs';\nconst x = require('../lib/db');\n",
        );
        assert_eq!(imports, vec!["./utils", "fs", "../lib/db"]);
    }

    #[test]
    fn bare_specifier_is_external() {
        let dir = TempDir::new().unwrap();
        let resolver = JsResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/index.ts",
        };
        assert!(resolver.resolve("express", &ctx).is_empty());
    }

    #[test]
    fn resolve_probes_extensions() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/utils.ts"), "").unwrap();

        let resolver = JsResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/index.ts",
        };
        assert_eq!(resolver.resolve("./utils", &ctx), vec!["src/utils.ts"]);
    }

    #[test]
    fn extensionless_file_does_not_shadow_source_module() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/utils"), "").unwrap();
        std::fs::write(dir.path().join("src/utils.ts"), "").unwrap();

        let resolver = JsResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/index.ts",
        };
        assert_eq!(resolver.resolve("./utils", &ctx), vec!["src/utils.ts"]);
    }

    #[test]
    fn resolve_probes_directory_index() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/store")).unwrap();
        std::fs::write(dir.path().join("src/store/index.js"), "").unwrap();

        let resolver = JsResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/index.ts",
        };
        assert_eq!(resolver.resolve("./store", &ctx), vec!["src/store/index.js"]);
    }

    #[test]
    fn resolve_walks_up_with_parent_segments() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("lib/db.js"), "").unwrap();

        let resolver = JsResolver::new();
        let ctx = ResolveContext {
            repo_root: dir.path(),
            current_file: "src/index.ts",
        };
        assert_eq!(resolver.resolve("../lib/db", &ctx), vec!["lib/db.js"]);
    }
}
