mod comm;
mod executor;
mod workspace;

use comm::{Comm, CommConfig};
use executor::{CommandRunner, ExecutorConfig, ToolRegistry};
use std::sync::Arc;
use tokio::signal;
use tracing::{Level, error, info, warn};
use tracing_subscriber::fmt;
use workspace::SystemEnv;

/// Log level from TERMINAL_LOG_LEVEL, defaulting to INFO
fn log_level() -> Level {
    std::env::var("TERMINAL_LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(Level::INFO)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // stdout carries the protocol; logs must go to stderr
    fmt()
        .with_max_level(log_level())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting terminal server...");

    let executor_config = ExecutorConfig::from_env();
    let comm_config = CommConfig::default();

    info!(
        timeout_secs = executor_config.timeout_secs,
        shell = %executor_config.shell,
        server = %comm_config.server_name,
        "Configuration loaded"
    );

    let runner = Arc::new(CommandRunner::new(&executor_config, Arc::new(SystemEnv)));

    // A bad workspace is not fatal: every call reports it until it is fixed.
    match runner.workspace().await {
        Ok(ws) => info!(workspace = %ws, "Workspace ready"),
        Err(e) => warn!(error = %e, "Workspace unavailable; run_command will fail until it exists"),
    }

    let registry = Arc::new(ToolRegistry::init(&executor_config, runner));
    info!(tools = registry.tool_definitions().len(), "Tools registered");

    let comm = Comm::new(comm_config, registry);

    tokio::select! {
        result = comm.run(tokio::io::stdin(), tokio::io::stdout()) => {
            if let Err(e) = result {
                error!(error = %e, "Comm server error");
                return Err(e.into());
            }
        }
        _ = async {
            if signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received shutdown signal");
        }
    }

    info!("Goodbye!");
    Ok(())
}
