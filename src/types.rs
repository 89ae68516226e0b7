//! Core domain types for mcpvet.
//!
//! The external representations here are load-bearing: `McpTool` serializes
//! to `{name, file_path, description, line_number, language}` and `Finding`
//! carries the fixed severity enumeration plus the optional `file_location`
//! the attribution engine keys on. Everything else on a finding is
//! scanner-specific pass-through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ToolLanguage
// ---------------------------------------------------------------------------

/// Source language an MCP tool is implemented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolLanguage {
    Python,
    TypeScript,
    JavaScript,
    Unknown,
}

impl ToolLanguage {
    /// Map a file extension (including the dot) to a language.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".py" | ".pyi" => Self::Python,
            ".ts" | ".tsx" => Self::TypeScript,
            ".js" | ".jsx" | ".mjs" | ".cjs" => Self::JavaScript,
            _ => Self::Unknown,
        }
    }

    /// Detect the language for a file path based on its extension.
    pub fn from_path(path: &str) -> Self {
        std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| Self::from_extension(&format!(".{e}")))
            .unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ToolLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// McpTool
// ---------------------------------------------------------------------------

/// A callable capability exposed by an MCP server, anchored to one source
/// file and optional declaration line.
///
/// Created once by a detection strategy and never mutated afterwards. Names
/// are not guaranteed globally unique across strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    /// Repository-relative anchor file. Empty for the synthesized placeholder
    /// tool, which anchors at the repository root.
    pub file_path: String,
    /// First line of adjacent documentation, empty when none was found.
    #[serde(default)]
    pub description: String,
    /// 1-based declaration line, 0 when unknown.
    #[serde(default)]
    pub line_number: u32,
    pub language: ToolLanguage,
}

impl McpTool {
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<String>,
        language: ToolLanguage,
    ) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
            description: String::new(),
            line_number: 0,
            language,
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Fixed severity enumeration shared by all scanner adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Unknown,
    None,
    Low,
    Medium,
    High,
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
            Self::Warning => "WARNING",
        }
    }

    /// Parse a scanner-reported severity string, falling back to `Unknown`.
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "NONE" => Self::None,
            "LOW" => Self::Low,
            "MEDIUM" | "MODERATE" => Self::Medium,
            "HIGH" => Self::High,
            "CRITICAL" => Self::Critical,
            "WARNING" => Self::Warning,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Finding
// ---------------------------------------------------------------------------

/// An external reference attached to a finding (advisory page, fix commit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingReference {
    pub r#type: String,
    pub url: String,
}

/// A numeric score attached to a finding (e.g. CVSS).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingScore {
    pub r#type: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One security/quality record produced by an external scanner.
///
/// The attribution engine only interprets `severity` and `file_location`;
/// every other field passes through untouched to the report files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    #[serde(default)]
    pub identifier_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<FindingReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<FindingScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_range: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

impl Finding {
    /// Minimal finding with everything optional left empty.
    pub fn new(id: impl Into<String>, severity: Severity) -> Self {
        Self {
            id: id.into(),
            identifier_type: String::new(),
            summary: String::new(),
            details: String::new(),
            severity,
            source: None,
            aliases: Vec::new(),
            fixed_version: None,
            published: None,
            references: Vec::new(),
            scores: Vec::new(),
            rule_id: None,
            confidence: None,
            file_location: None,
            line_range: None,
            categories: Vec::new(),
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.file_location = Some(location.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
