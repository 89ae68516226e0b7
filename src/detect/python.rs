//! Static tool extraction for Python MCP servers (FastMCP, official SDK).

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;

use crate::types::{McpTool, ToolLanguage};

use super::ToolExtractor;

/// Dependency manifests checked for the repository-level MCP signal.
const PYTHON_DEP_FILES: &[&str] = &["requirements.txt", "pyproject.toml", "Pipfile"];

/// Matches `@mcp.tool()` / `@server.tool()` / bare `@tool()` decorators
/// immediately preceding a (possibly async) function definition.
///
/// Capture 1 is the optional `name="…"` override, capture 2 the function
/// identifier.
pub struct PythonExtractor {
    tool_patterns: Vec<Regex>,
    docstring_pattern: Regex,
}

impl PythonExtractor {
    pub fn new() -> Self {
        let tool_patterns = vec![
            Regex::new(
                r#"@(?:mcp|server)\.tool\(\s*(?:name=["']([^"']+)["'])?\s*\)\s*\n\s*(?:async\s+)?def\s+(\w+)"#,
            )
            .expect("valid python decorator pattern"),
            Regex::new(
                r#"@tool\(\s*(?:name=["']([^"']+)["'])?\s*\)\s*\n\s*(?:async\s+)?def\s+(\w+)"#,
            )
            .expect("valid python decorator pattern"),
        ];
        let docstring_pattern =
            Regex::new(r#"(?s)def\s+(\w+)\s*\([^)]*\)\s*(?:->.*?)?\s*:\s*"""([^"]+)""""#)
                .expect("valid docstring pattern");
        Self {
            tool_patterns,
            docstring_pattern,
        }
    }

    /// Map function name to the first line of its docstring.
    fn docstrings(&self, content: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for caps in self.docstring_pattern.captures_iter(content) {
            let (Some(name), Some(doc)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let first_line = doc
                .as_str()
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            map.entry(name.as_str().to_string()).or_insert(first_line);
        }
        map
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolExtractor for PythonExtractor {
    fn language(&self) -> ToolLanguage {
        ToolLanguage::Python
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn extract(&self, relative_path: &str, content: &str) -> Vec<McpTool> {
        let docstrings = self.docstrings(content);
        let mut tools = Vec::new();

        for pattern in &self.tool_patterns {
            for caps in pattern.captures_iter(content) {
                let Some(func) = caps.get(2) else { continue };
                let func_name = func.as_str();
                // Explicit name= override in the decorator wins.
                let tool_name = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or(func_name);
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                let line_number = content[..start].matches('\n').count() as u32 + 1;

                tools.push(McpTool {
                    name: tool_name.to_string(),
                    file_path: relative_path.to_string(),
                    description: docstrings.get(func_name).cloned().unwrap_or_default(),
                    line_number,
                    language: ToolLanguage::Python,
                });
            }
        }

        tools
    }

    fn is_mcp_server(&self, repo_root: &Path) -> bool {
        PYTHON_DEP_FILES.iter().any(|dep| {
            std::fs::read_to_string(repo_root.join(dep))
                .map(|content| content.contains("mcp") || content.contains("fastmcp"))
                .unwrap_or(false)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
