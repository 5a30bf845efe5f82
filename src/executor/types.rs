// Data types for Executor module

use serde::{Deserialize, Serialize};

/// One execution request: the full shell command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

impl CommandRequest {
    #[allow(dead_code)]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// True if there is nothing to run after trimming whitespace.
    pub fn is_blank(&self) -> bool {
        self.command.trim().is_empty()
    }
}

/// Structured outcome of one execution.
///
/// A non-zero exit is a normal result: `error_message` stays unset and
/// `exit_code` carries the status. `error_message` is only set when the
/// command could not be run to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CommandResult {
    /// The process ran and exited with `exit_code`.
    pub fn completed(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            succeeded: exit_code == 0,
            exit_code: Some(exit_code),
            stdout,
            stderr,
            error_message: None,
        }
    }

    /// Nothing was spawned.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error_message: Some(message.into()),
        }
    }

    /// The process started but was cut short; keeps whatever it produced.
    pub fn aborted(
        message: impl Into<String>,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    ) -> Self {
        Self {
            succeeded: false,
            exit_code,
            stdout,
            stderr,
            error_message: Some(message.into()),
        }
    }
}

/// Tool definition advertised to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Output from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Rendered text for the caller
    pub content: String,
    /// Whether the execution failed (including non-zero exit)
    #[serde(default)]
    pub is_error: bool,
    /// Machine-readable result, if the tool has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<serde_json::Value>,
}
