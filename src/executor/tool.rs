// Tool trait and description loading
#![allow(clippy::collapsible_if)]

use crate::executor::{Result, ToolDefinition, ToolOutput};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Internal trait for tool implementations
#[async_trait]
pub trait ToolImpl: Send + Sync {
    /// Get the tool definition (name, description, input_schema)
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with JSON input
    async fn run(&self, input: serde_json::Value) -> Result<ToolOutput>;
}

/// Load tool descriptions from TOML config file
pub fn load_tool_descriptions(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        debug!(path = %path.display(), "tools.toml not found, using default descriptions");
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)?;
    let config: toml::Table = toml::from_str(&content)?;

    let mut descriptions = HashMap::new();

    for (key, value) in &config {
        if let Some(desc) = value.get("description") {
            if let Some(s) = desc.as_str() {
                descriptions.insert(key.clone(), s.to_string());
            }
        }
    }

    debug!(path = %path.display(), tool_count = descriptions.len(), "loaded tool descriptions from config");
    Ok(descriptions)
}
