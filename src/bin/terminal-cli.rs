//! terminal-cli
//!
//! Runs commands in the workspace through the same executor the server uses.
//! With `-c` it runs one command and exits with its status; otherwise it opens
//! a readline prompt with history.
#![allow(dead_code)]

#[path = "../executor/mod.rs"]
mod executor;
#[path = "../workspace/mod.rs"]
mod workspace;

use clap::Parser;
use executor::{CommandResult, CommandRunner, ExecutorConfig};
use rustyline::Editor;
use rustyline::history::FileHistory;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use workspace::{ConfigSource, MapSource, SystemEnv, WORKSPACE_ENV_VAR};

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "terminal-cli")]
#[command(about = "Run shell commands confined to the workspace directory")]
struct Args {
    /// Workspace directory (overrides MCP_WORKSPACE)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Command timeout in seconds (overrides TERMINAL_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    /// Shell program (overrides TERMINAL_SHELL)
    #[arg(long)]
    shell: Option<String>,

    /// Run a single command and exit with its exit code
    #[arg(short, long)]
    command: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// History file path
    #[arg(long)]
    history_file: Option<PathBuf>,
}

fn build_runner(args: &Args) -> CommandRunner {
    let mut config = ExecutorConfig::from_env();
    if let Some(timeout) = args.timeout.filter(|t| *t > 0) {
        config.timeout_secs = timeout;
    }
    if let Some(shell) = &args.shell {
        config.shell = shell.clone();
    }

    let source: Arc<dyn ConfigSource> = match &args.workspace {
        Some(dir) => {
            let mut source = MapSource::new().with_var(WORKSPACE_ENV_VAR, dir.as_os_str());
            if let Some(home) = dirs::home_dir() {
                source = source.with_home(home);
            }
            if let Ok(cwd) = std::env::current_dir() {
                source = source.with_current_dir(cwd);
            }
            Arc::new(source)
        }
        None => Arc::new(SystemEnv),
    };

    CommandRunner::new(&config, source)
}

fn print_result(result: &CommandResult, json: bool) -> io::Result<()> {
    if json {
        let text = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
        println!("{text}");
        return Ok(());
    }

    print!("{}", result.stdout);
    eprint!("{}", result.stderr);
    io::stdout().flush()?;

    if let Some(message) = &result.error_message {
        eprintln!("[error] {message}");
    } else if let Some(code) = result.exit_code
        && code != 0
    {
        eprintln!("[exit {code}]");
    }
    Ok(())
}

fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let runner = build_runner(&args);

    let rt = tokio::runtime::Runtime::new()?;

    if let Some(command) = args.command.clone() {
        let result = rt.block_on(runner.execute(&command));
        print_result(&result, args.json)?;
        std::process::exit(result.exit_code.unwrap_or(1));
    }

    rt.block_on(run_repl(runner, &args))
}

async fn run_repl(runner: CommandRunner, args: &Args) -> io::Result<()> {
    let history_file = args.history_file.clone().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|p| p.join(".terminal_history"))
            .unwrap_or_else(|| PathBuf::from(".terminal_history"))
    });

    let mut rl: Editor<(), FileHistory> = Editor::new().map_err(io::Error::other)?;

    if history_file.exists()
        && let Err(e) = rl.load_history(&history_file)
    {
        eprintln!("[warning] Failed to load history: {}", e);
    }

    println!("terminal-cli v{}", env!("CARGO_PKG_VERSION"));
    match runner.workspace().await {
        Ok(ws) => println!("Workspace: {ws}"),
        Err(e) => println!("[warning] {e}"),
    }
    println!("Type a command and press Enter. Ctrl+D to quit.");
    println!();

    loop {
        match rl.readline("$ ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(input);

                let result = runner.execute(input).await;
                print_result(&result, args.json)?;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                // Ctrl+C - cancel current input, continue
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("[error] Readline error: {}", e);
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file) {
        eprintln!("[warning] Failed to save history: {}", e);
    }

    println!("\nGoodbye!");
    Ok(())
}
