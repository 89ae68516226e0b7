//! Runtime tool discovery over the MCP stdio protocol.
//!
//! Spawns the server's entrypoint as a child process, performs the JSON-RPC
//! `initialize` / `tools/list` handshake over newline-delimited JSON on
//! stdin/stdout, and maps each advertised tool back to a source anchor.
//! Every failure mode degrades to an empty result so the static strategies
//! can take over.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::types::{McpTool, ToolLanguage};

use super::source_files;

/// Entrypoints probed in order before falling back to a recursive search.
const ENTRY_CANDIDATES: &[&str] = &[
    "server.py",
    "main.py",
    "__main__.py",
    "src/server.py",
    "src/main.py",
    "src/__main__.py",
    "index.ts",
    "server.ts",
    "index.js",
    "server.js",
    "src/index.ts",
    "src/server.ts",
    "package.json",
];

const FALLBACK_BASENAMES: &[&str] = &["server.py", "main.py", "__main__.py", "index.ts", "server.ts"];

const STDOUT_CAP: usize = 100 * 1024;

pub struct RuntimeDiscoverer {
    repo_root: PathBuf,
    timeout: Duration,
}

impl RuntimeDiscoverer {
    pub fn new(repo_root: &Path, timeout: Duration) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            timeout,
        }
    }

    /// Attempt live discovery. Returns an empty vec on any failure: no
    /// entrypoint, spawn error, handshake timeout, or malformed response.
    pub fn discover(&self) -> Vec<McpTool> {
        let Some(entry) = self.find_entrypoint() else {
            debug!("no server entrypoint found, skipping runtime discovery");
            return Vec::new();
        };
        let Some(command) = self.server_command(&entry) else {
            debug!(entry = %entry, "no launch command for entrypoint");
            return Vec::new();
        };

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                warn!(error = %err, "failed to build runtime for live discovery");
                return Vec::new();
            }
        };

        let response = runtime.block_on(self.query_tools(&command));
        match response {
            Some(tools_json) => self.parse_tools_response(&entry, &tools_json),
            None => Vec::new(),
        }
    }

    /// Probe the fixed candidate list, then search for server-like basenames
    /// anywhere under the root. Candidates must carry MCP server signatures
    /// to qualify.
    fn find_entrypoint(&self) -> Option<String> {
        for candidate in ENTRY_CANDIDATES {
            let path = self.repo_root.join(candidate);
            if path.is_file() && self.is_server_entry(candidate) {
                return Some((*candidate).to_string());
            }
        }
        for relative in source_files(&self.repo_root, &[".py", ".ts", ".js"]) {
            let basename = relative.rsplit('/').next().unwrap_or(&relative);
            if FALLBACK_BASENAMES.contains(&basename) && self.is_server_entry(&relative) {
                return Some(relative);
            }
        }
        None
    }

    fn is_server_entry(&self, relative: &str) -> bool {
        let Ok(content) = std::fs::read_to_string(self.repo_root.join(relative)) else {
            return false;
        };
        if relative.ends_with(".py") {
            const SIGNATURES: &[&str] = &[
                "mcp.run()",
                "FastMCP(",
                "Server(",
                "from mcp import",
                "from fastmcp import",
                "import mcp",
                "import fastmcp",
            ];
            return SIGNATURES.iter().any(|sig| content.contains(sig));
        }
        if relative.ends_with(".ts") || relative.ends_with(".js") {
            const SIGNATURES: &[&str] = &[
                "@modelcontextprotocol/sdk",
                "new Server(",
                "StdioServerTransport",
            ];
            return SIGNATURES.iter().any(|sig| content.contains(sig));
        }
        if relative == "package.json" {
            let Ok(manifest) = serde_json::from_str::<Value>(&content) else {
                return false;
            };
            return manifest.get("bin").is_some()
                || manifest
                    .get("scripts")
                    .and_then(|s| s.get("start"))
                    .is_some();
        }
        false
    }

    /// Derive the launch command for an entrypoint from the surrounding
    /// manifests.
    fn server_command(&self, entry: &str) -> Option<Vec<String>> {
        if entry.ends_with(".py") {
            if let Some(script) = self.pyproject_script() {
                return Some(vec!["uv".into(), "run".into(), script]);
            }
            return Some(vec!["python".into(), entry.to_string()]);
        }

        let package_json = std::fs::read_to_string(self.repo_root.join("package.json"))
            .ok()
            .and_then(|c| serde_json::from_str::<Value>(&c).ok());

        if let Some(manifest) = &package_json {
            if manifest
                .get("scripts")
                .and_then(|s| s.get("start"))
                .is_some()
            {
                return Some(vec!["npm".into(), "start".into()]);
            }
            if let Some(bin) = manifest.get("bin") {
                let target = match bin {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(map) => map.values().next().and_then(|v| v.as_str()).map(String::from),
                    _ => None,
                };
                if let Some(target) = target {
                    return Some(vec!["node".into(), target]);
                }
            }
        }

        if entry.ends_with(".ts") {
            return Some(vec!["npx".into(), "tsx".into(), entry.to_string()]);
        }
        if entry.ends_with(".js") {
            return Some(vec!["node".into(), entry.to_string()]);
        }
        None
    }

    /// First entry of `[project.scripts]` in pyproject.toml, if any.
    fn pyproject_script(&self) -> Option<String> {
        let content = std::fs::read_to_string(self.repo_root.join("pyproject.toml")).ok()?;
        let manifest: toml::Value = toml::from_str(&content).ok()?;
        manifest
            .get("project")?
            .get("scripts")?
            .as_table()?
            .keys()
            .next()
            .cloned()
    }

    /// Run the handshake against a spawned server and return the raw
    /// `tools/list` result payload.
    async fn query_tools(&self, command: &[String]) -> Option<Value> {
        let (program, args) = command.split_first()?;
        let mut child = match Command::new(program)
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                debug!(program = %program, error = %err, "failed to spawn server");
                return None;
            }
        };

        let initialize = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "mcpvet", "version": env!("CARGO_PKG_VERSION")}
            }
        });
        let list_tools = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/list",
            "params": {}
        });

        if let Some(mut stdin) = child.stdin.take() {
            let payload = format!("{initialize}\n{list_tools}\n");
            if stdin.write_all(payload.as_bytes()).await.is_err() {
                let _ = child.kill().await;
                return None;
            }
            let _ = stdin.flush().await;
            drop(stdin);
        }

        let mut stdout = child.stdout.take()?;
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut buffer = Vec::new();
        let mut result = None;

        'read: while tokio::time::Instant::now() < deadline && buffer.len() < STDOUT_CAP {
            let mut chunk = [0u8; 4096];
            let read = tokio::time::timeout_at(deadline, stdout.read(&mut chunk)).await;
            let n = match read {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => n,
                Ok(Err(_)) => break,
            };
            buffer.extend_from_slice(&chunk[..n]);

            for line in String::from_utf8_lossy(&buffer).lines() {
                let Ok(message) = serde_json::from_str::<Value>(line) else {
                    continue;
                };
                if message.get("id").and_then(Value::as_i64) == Some(2) {
                    result = message.get("result").cloned();
                    break 'read;
                }
            }
        }

        // Give the server a moment to exit cleanly, then force it down.
        if tokio::time::timeout(Duration::from_secs(2), child.wait())
            .await
            .is_err()
        {
            let _ = child.kill().await;
        }

        result
    }

    /// Map the `tools/list` result payload to anchored [`McpTool`] records.
    fn parse_tools_response(&self, entry: &str, result: &Value) -> Vec<McpTool> {
        let Some(tools) = result.get("tools").and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for tool in tools {
            let Some(name) = tool.get("name").and_then(Value::as_str) else {
                continue;
            };
            let description = tool
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let (file_path, line_number) = self
                .find_tool_in_source(entry, name)
                .unwrap_or_else(|| (entry.to_string(), 0));
            out.push(McpTool {
                name: name.to_string(),
                file_path,
                description,
                line_number,
                language: ToolLanguage::from_path(entry),
            });
        }
        out
    }

    /// Search the entrypoint and its same-extension siblings for the tool's
    /// defining function.
    fn find_tool_in_source(&self, entry: &str, tool_name: &str) -> Option<(String, u32)> {
        let needles = [
            format!("def {tool_name}("),
            format!("async def {tool_name}("),
            format!("function {tool_name}("),
            format!("async function {tool_name}("),
        ];

        let extension = Path::new(entry)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))?;
        let entry_dir = match entry.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        };

        let mut candidates = vec![entry.to_string()];
        for relative in source_files(&self.repo_root, &[extension.as_str()]) {
            let dir = match relative.rsplit_once('/') {
                Some((dir, _)) => dir,
                None => "",
            };
            if dir == entry_dir && relative != entry {
                candidates.push(relative);
            }
        }

        for candidate in candidates {
            let Ok(content) = std::fs::read_to_string(self.repo_root.join(&candidate)) else {
                continue;
            };
            for (index, line) in content.lines().enumerate() {
                if needles.iter().any(|needle| line.contains(needle)) {
                    return Some((candidate, index as u32 + 1));
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn discoverer(dir: &TempDir) -> RuntimeDiscoverer {
        RuntimeDiscoverer::new(dir.path(), Duration::from_secs(5))
    }

    #[test]
    fn finds_python_entrypoint_with_signature() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("server.py"),
            "from mcp import Server\n\nmcp.run()\n",
        )
        .unwrap();
        assert_eq!(discoverer(&dir).find_entrypoint().as_deref(), Some("server.py"));
    }

    #[test]
    fn rejects_entrypoint_without_signature() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("server.py"), "print('hello')\n").unwrap();
        assert_eq!(discoverer(&dir).find_entrypoint(), None);
    }

    #[test]
    fn falls_back_to_nested_entrypoint() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("app/inner")).unwrap();
        std::fs::write(
            dir.path().join("app/inner/server.py"),
            "from fastmcp import FastMCP\n",
        )
        .unwrap();
        assert_eq!(
            discoverer(&dir).find_entrypoint().as_deref(),
            Some("app/inner/server.py")
        );
    }

    #[test]
    fn python_command_prefers_pyproject_script() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\nname = \"demo\"\n\n[project.scripts]\ndemo-server = \"demo:main\"\n",
        )
        .unwrap();
        assert_eq!(
            discoverer(&dir).server_command("server.py"),
            Some(vec!["uv".to_string(), "run".to_string(), "demo-server".to_string()])
        );
    }

    #[test]
    fn python_command_defaults_to_interpreter() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            discoverer(&dir).server_command("server.py"),
            Some(vec!["python".to_string(), "server.py".to_string()])
        );
    }

    #[test]
    fn node_command_uses_npm_start_when_available() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts": {"start": "node dist/index.js"}}"#,
        )
        .unwrap();
        assert_eq!(
            discoverer(&dir).server_command("index.js"),
            Some(vec!["npm".to_string(), "start".to_string()])
        );
    }

    #[test]
    fn parse_tools_response_anchors_to_definition() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("server.py"),
            "import mcp\n\n@mcp.tool()\ndef fetch_page(url):\n    pass\n",
        )
        .unwrap();
        let result = json!({
            "tools": [{"name": "fetch_page", "description": "Fetch a page"}]
        });
        let tools = discoverer(&dir).parse_tools_response("server.py", &result);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "fetch_page");
        assert_eq!(tools[0].file_path, "server.py");
        assert_eq!(tools[0].line_number, 4);
        assert_eq!(tools[0].language, ToolLanguage::Python);
    }

    #[test]
    fn parse_tools_response_falls_back_to_entry_line_zero() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("server.py"), "import mcp\n").unwrap();
        let result = json!({"tools": [{"name": "ghost"}]});
        let tools = discoverer(&dir).parse_tools_response("server.py", &result);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].file_path, "server.py");
        assert_eq!(tools[0].line_number, 0);
    }

    #[test]
    fn discover_returns_empty_without_entrypoint() {
        let dir = TempDir::new().unwrap();
        assert!(discoverer(&dir).discover().is_empty());
    }
}
