// run_command tool implementation

use crate::executor::{
    CommandRequest, CommandResult, CommandRunner, ExecutorError, Result, ToolDefinition, ToolImpl,
    ToolOutput,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const RUN_COMMAND: &str = "run_command";

/// Executes a shell command in the workspace
pub struct RunCommandTool {
    description: String,
    runner: Arc<CommandRunner>,
}

impl RunCommandTool {
    pub fn new(description: impl Into<String>, runner: Arc<CommandRunner>) -> Self {
        Self {
            description: description.into(),
            runner,
        }
    }
}

#[async_trait]
impl ToolImpl for RunCommandTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: RUN_COMMAND.to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The full shell command to execute"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput> {
        let request: CommandRequest = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput(RUN_COMMAND.to_string(), e.to_string()))?;

        let result = self.runner.run(request).await;

        Ok(ToolOutput {
            content: render(&result),
            is_error: !result.succeeded,
            structured: Some(serde_json::to_value(&result)?),
        })
    }
}

/// Render a result as sectioned text
pub fn render(result: &CommandResult) -> String {
    let mut content = String::new();

    if !result.stdout.is_empty() {
        content.push_str("[stdout]\n");
        content.push_str(&result.stdout);
    }

    if !result.stderr.is_empty() {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str("[stderr]\n");
        content.push_str(&result.stderr);
    }

    if let Some(message) = &result.error_message {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str("[error]\n");
        content.push_str(message);
    }

    if let Some(code) = result.exit_code {
        if content.is_empty() && code == 0 {
            return "Command executed successfully with no output.".to_string();
        }
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(&format!("[exit_code]\n{code}"));
    }

    content
}

/// Default run_command tool description
pub fn default_run_command_description() -> String {
    r#"Execute a shell command in the workspace directory.
The command runs through the host shell (/bin/sh -c on Unix, cmd /C on Windows),
so pipes, redirects and built-ins work. The working directory is the workspace;
files outside it are not protected. Stdout and stderr are captured separately and
the exit code is returned. Long-running commands are killed after a timeout."#
        .to_string()
}
