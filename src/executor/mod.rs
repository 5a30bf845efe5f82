// Executor module - runs shell commands inside the workspace
// Core: runner.rs. Tool layer: tool.rs, command_tool.rs, registry.rs

pub mod command_tool;
pub mod config;
pub mod error;
pub mod process;
pub mod registry;
pub mod runner;
pub mod shell;
pub mod tool;
pub mod types;

pub use command_tool::RunCommandTool;
pub use config::ExecutorConfig;
pub use error::{ExecutorError, Result};
pub use registry::ToolRegistry;
pub use runner::CommandRunner;
pub use shell::{ShellStrategy, SystemShell};
pub use tool::ToolImpl;
pub use types::{CommandRequest, CommandResult, ToolDefinition, ToolOutput};
