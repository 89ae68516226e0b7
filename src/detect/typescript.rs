//! Static tool extraction for TypeScript/JavaScript MCP servers.
//!
//! Covers the two declaration idioms seen in the wild: a `@Tool({...})`
//! decorator on a handler function, and the official SDK's
//! `setRequestHandler(ListToolsRequestSchema, ...)` registration whose body
//! enumerates tool names.

use std::path::Path;

use regex::Regex;

use crate::types::{McpTool, ToolLanguage};

use super::ToolExtractor;

pub struct TypeScriptExtractor {
    tool_patterns: Vec<Regex>,
}

impl TypeScriptExtractor {
    pub fn new() -> Self {
        let tool_patterns = vec![
            // @Tool({ ... }) decorator, capture = function identifier
            Regex::new(r#"@Tool\(\{[^}]*\}\)\s*(?:async\s+)?(?:function\s+)?(\w+)"#)
                .expect("valid @Tool pattern"),
            // setRequestHandler(ListToolsRequestSchema, ...) body entries
            Regex::new(
                r#"(?s)setRequestHandler\s*\(\s*ListToolsRequestSchema[^)]*\).*?name:\s*["']([^"']+)["']"#,
            )
            .expect("valid setRequestHandler pattern"),
        ];
        Self { tool_patterns }
    }

    /// Pull the `description:` property out of the `@Tool({...})` object for
    /// a given handler name, when present.
    fn decorator_description(&self, content: &str, tool_name: &str) -> String {
        let pattern = format!(
            r#"@Tool\(\{{[^}}]*description:\s*["']([^"']+)["'][^}}]*\}}\)\s*(?:async\s+)?(?:function\s+)?{}"#,
            regex::escape(tool_name)
        );
        Regex::new(&pattern)
            .ok()
            .and_then(|re| re.captures(content))
            .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .unwrap_or_default()
    }
}

impl Default for TypeScriptExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolExtractor for TypeScriptExtractor {
    fn language(&self) -> ToolLanguage {
        ToolLanguage::TypeScript
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".ts", ".tsx", ".js", ".jsx"]
    }

    fn extract(&self, relative_path: &str, content: &str) -> Vec<McpTool> {
        let mut tools = Vec::new();

        for pattern in &self.tool_patterns {
            for caps in pattern.captures_iter(content) {
                let Some(name) = caps.get(1) else { continue };
                let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
                let line_number = content[..start].matches('\n').count() as u32 + 1;

                tools.push(McpTool {
                    name: name.as_str().to_string(),
                    file_path: relative_path.to_string(),
                    description: self.decorator_description(content, name.as_str()),
                    line_number,
                    language: ToolLanguage::TypeScript,
                });
            }
        }

        tools
    }

    fn is_mcp_server(&self, repo_root: &Path) -> bool {
        let Ok(content) = std::fs::read_to_string(repo_root.join("package.json")) else {
            return false;
        };
        let Ok(manifest) = serde_json::from_str::<serde_json::Value>(&content) else {
            return false;
        };
        for key in ["dependencies", "devDependencies"] {
            if let Some(deps) = manifest.get(key).and_then(|d| d.as_object()) {
                if deps
                    .keys()
                    .any(|name| name.contains("modelcontextprotocol") || name.to_lowercase().contains("mcp"))
                {
                    return true;
                }
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
