//! mcpvet: vulnerability scanning for MCP server repositories with per-tool
//! attribution.
//!
//! The pipeline has four stages:
//!
//! 1. **Detection** ([`detect`]): find the repository's MCP tools, preferring
//!    live protocol introspection of the running server and falling back to
//!    static extraction, then a placeholder.
//! 2. **Closure** ([`graph`]): for each tool, follow local imports from its
//!    anchor file to a fixpoint.
//! 3. **Scanning** ([`scanners`]): run external scanners concurrently and
//!    normalize their JSON into [`types::Finding`] records.
//! 4. **Attribution** ([`attribution`]): partition every finding into exactly
//!    one bucket, a tool name or `dependencies`/`unknown`.

pub mod attribution;
pub mod detect;
pub mod error;
pub mod graph;
pub mod observability;
pub mod report;
pub mod scanners;
pub mod types;

pub use error::{McpVetError, Result};
