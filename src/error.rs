//! Crate-wide error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpVetError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scanner error: {0}")]
    Scanner(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, McpVetError>;
