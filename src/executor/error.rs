// Error types for Executor module

use crate::workspace::WorkspaceError;
use thiserror::Error;

/// Executor error types
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("empty command")]
    EmptyCommand,

    #[error("workspace configuration error: {0}")]
    Configuration(#[from] WorkspaceError),

    #[error("failed to spawn shell '{0}': {1}")]
    SpawnFailed(String, String),

    #[error("timeout exceeded")]
    Timeout,

    #[error("failed to capture output: {0}")]
    OutputCaptureFailed(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input for tool '{0}': {1}")]
    InvalidInput(String, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
