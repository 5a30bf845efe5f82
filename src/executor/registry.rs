// Tool registry

use crate::executor::command_tool::{RUN_COMMAND, RunCommandTool, default_run_command_description};
use crate::executor::config::ExecutorConfig;
use crate::executor::error::{ExecutorError, Result};
use crate::executor::runner::CommandRunner;
use crate::executor::tool::{ToolImpl, load_tool_descriptions};
use crate::executor::types::{ToolDefinition, ToolOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dispatches tool calls by name
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolImpl>>,
}

impl ToolRegistry {
    /// Initialize with registered tools
    pub fn init(config: &ExecutorConfig, runner: Arc<CommandRunner>) -> Self {
        // Load tool descriptions from config file
        let descriptions = match load_tool_descriptions(&config.tools_toml_path) {
            Ok(descriptions) => descriptions,
            Err(e) => {
                warn!(
                    path = %config.tools_toml_path.display(),
                    error = %e,
                    "ignoring unreadable tool descriptions"
                );
                HashMap::new()
            }
        };

        let description = descriptions
            .get(RUN_COMMAND)
            .cloned()
            .unwrap_or_else(default_run_command_description);

        let mut tools: HashMap<String, Arc<dyn ToolImpl>> = HashMap::new();
        tools.insert(
            RUN_COMMAND.to_string(),
            Arc::new(RunCommandTool::new(description, runner)),
        );

        info!(tool_count = tools.len(), "tool registry initialized");

        Self { tools }
    }

    /// All tool definitions, sorted by name
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute a tool by name with JSON input
    pub async fn call(&self, tool_name: &str, input: serde_json::Value) -> Result<ToolOutput> {
        debug!(tool_name = %tool_name, "looking up tool");

        let tool = self
            .tools
            .get(tool_name)
            .cloned()
            .ok_or_else(|| ExecutorError::UnknownTool(tool_name.to_string()))?;

        info!(tool_name = %tool_name, "executing tool");
        tool.run(input).await
    }
}
