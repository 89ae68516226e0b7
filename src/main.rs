//! mcpvet command-line interface.
//!
//! `main` is deliberately synchronous: tool detection must run outside any
//! tokio runtime so live server discovery is allowed, and the scanner stage
//! builds its own runtime afterwards.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use mcpvet::attribution::attribute_findings;
use mcpvet::detect::ToolDetector;
use mcpvet::error::{McpVetError, Result};
use mcpvet::graph::ClosureBuilder;
use mcpvet::observability::init_logging;
use mcpvet::report::ReportWriter;
use mcpvet::scanners::{run_scanners, scanner_by_name, select_scanners, Scanner};

#[derive(Parser)]
#[command(name = "mcpvet", version, about = "Scan MCP server repositories and attribute findings to tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scanners against a repository and write attributed reports.
    Scan {
        /// Path to the repository to scan.
        path: PathBuf,

        /// Directory for report files.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Restrict to specific scanners (default: all applicable).
        #[arg(long, value_delimiter = ',')]
        scanners: Vec<String>,

        /// Runtime discovery timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Skip live server discovery, use only static extraction.
        #[arg(long)]
        no_runtime_detection: bool,
    },

    /// Detect and print a repository's MCP tools without scanning.
    Tools {
        /// Path to the repository to inspect.
        path: PathBuf,

        /// Runtime discovery timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Skip live server discovery, use only static extraction.
        #[arg(long)]
        no_runtime_detection: bool,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Scan {
            path,
            output_dir,
            scanners,
            timeout,
            no_runtime_detection,
        } => scan(path, output_dir, scanners, timeout, no_runtime_detection),
        Commands::Tools {
            path,
            timeout,
            no_runtime_detection,
        } => tools(path, timeout, no_runtime_detection),
    };

    if let Err(err) = outcome {
        error!(error = %err, "command failed");
        std::process::exit(1);
    }
}

fn detect_tools(
    path: &PathBuf,
    timeout: u64,
    no_runtime_detection: bool,
) -> Vec<mcpvet::types::McpTool> {
    ToolDetector::new(path)
        .with_runtime_detection(!no_runtime_detection)
        .with_timeout(Duration::from_secs(timeout))
        .detect()
}

fn scan(
    path: PathBuf,
    output_dir: PathBuf,
    scanner_names: Vec<String>,
    timeout: u64,
    no_runtime_detection: bool,
) -> Result<()> {
    if !path.is_dir() {
        return Err(McpVetError::Other(format!(
            "not a directory: {}",
            path.display()
        )));
    }

    let tools = detect_tools(&path, timeout, no_runtime_detection);
    info!(tools = tools.len(), "tool detection finished");

    let closures = ClosureBuilder::new(&path).build(&tools);

    let scanners: Vec<Box<dyn Scanner>> = if scanner_names.is_empty() {
        select_scanners(&path)
    } else {
        scanner_names
            .iter()
            .map(|name| {
                scanner_by_name(name)
                    .ok_or_else(|| McpVetError::Other(format!("unknown scanner: {name}")))
            })
            .collect::<Result<_>>()?
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let results = runtime.block_on(run_scanners(&scanners, &path));

    let writer = ReportWriter::new(&output_dir, &path);
    writer.save_tools_metadata(&tools)?;
    writer.save_violations(&results)?;
    for (scanner, findings) in &results {
        let buckets = attribute_findings(findings, &closures, &path);
        writer.save_tool_violations(scanner, &buckets)?;
    }

    info!(output = %output_dir.display(), "scan complete");
    Ok(())
}

fn tools(path: PathBuf, timeout: u64, no_runtime_detection: bool) -> Result<()> {
    if !path.is_dir() {
        return Err(McpVetError::Other(format!(
            "not a directory: {}",
            path.display()
        )));
    }

    let tools = detect_tools(&path, timeout, no_runtime_detection);
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}
