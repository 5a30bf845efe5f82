// Executor configuration

use crate::executor::shell::{ShellStrategy, SystemShell};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Default wall-clock limit for one command
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum execution time in seconds
    pub timeout_secs: u64,
    /// Path to tools.toml configuration file
    pub tools_toml_path: PathBuf,
    /// Shell program for command execution
    pub shell: String,
    /// Arguments placed before the command string
    pub shell_args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let shell = SystemShell::default();
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tools_toml_path: PathBuf::from("tools.toml"),
            shell: shell.program().to_string(),
            shell_args: shell.args().to_vec(),
        }
    }
}

/// Parse an environment variable, logging a warning if the value is present but invalid.
fn parse_env_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => match v.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(var = name, value = %v, "Invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl ExecutorConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let mut config = ExecutorConfig::default();

        config.timeout_secs = parse_env_var("TERMINAL_TIMEOUT_SECS", config.timeout_secs);
        if config.timeout_secs == 0 {
            warn!(
                var = "TERMINAL_TIMEOUT_SECS",
                "Timeout must be positive, using default"
            );
            config.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }

        if let Ok(shell) = std::env::var("TERMINAL_SHELL")
            && !shell.trim().is_empty()
        {
            config.shell = shell.trim().to_string();
        }

        config.tools_toml_path = parse_env_var("TERMINAL_TOOLS_TOML", config.tools_toml_path);

        config
    }

    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
