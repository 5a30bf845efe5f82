// Integration tests for Executor module
// This file should be run with cargo test --test test_executor

#[path = "../src/workspace/mod.rs"]
mod workspace;

#[path = "../src/executor/mod.rs"]
mod executor;

use executor::{CommandRunner, ExecutorConfig, SystemShell, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use workspace::{MapSource, WORKSPACE_ENV_VAR};

fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_thread_ids(true)
            .with_test_writer()
            .init();
    });
}

fn source_for(dir: &std::path::Path) -> Arc<MapSource> {
    Arc::new(MapSource::new().with_var(WORKSPACE_ENV_VAR, dir))
}

fn create_runner(dir: &TempDir) -> CommandRunner {
    CommandRunner::new(&ExecutorConfig::default(), source_for(dir.path()))
}

#[cfg(unix)]
mod tests {
    use super::*;

    /// Exit 0 is success with no error message
    #[tokio::test]
    async fn test_success_exit_zero() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        let result = runner.execute("echo hello").await;

        assert!(result.succeeded);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "");
        assert!(result.error_message.is_none());
    }

    /// Non-zero exit is a result, not an error
    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        for code in [1, 2, 42, 255] {
            let result = runner.execute(&format!("echo oops >&2; exit {code}")).await;
            assert!(!result.succeeded);
            assert_eq!(result.exit_code, Some(code));
            assert_eq!(result.stderr, "oops\n");
            assert!(result.error_message.is_none(), "exit {code} must not set errorMessage");
        }
    }

    /// pwd prints the resolved workspace
    #[tokio::test]
    async fn test_pwd_is_workspace() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        let ws = runner.workspace().await.unwrap().clone();
        let result = runner.execute("pwd").await;

        assert!(result.succeeded);
        assert_eq!(result.stdout.trim(), ws.path().to_str().unwrap());

        let physical = runner.execute("pwd -P").await;
        assert_eq!(physical.stdout.trim(), ws.path().to_str().unwrap());
    }

    /// Relative file operations land inside the workspace
    #[tokio::test]
    async fn test_files_written_in_workspace() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        let result = runner.execute("echo data > out.txt && cat out.txt | tr a-z A-Z").await;

        assert!(result.succeeded);
        assert_eq!(result.stdout, "DATA\n");
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "data\n"
        );
    }

    /// Blank commands are rejected before spawning
    #[tokio::test]
    async fn test_empty_command() {
        init_tracing();
        // Workspace missing on purpose: validation must come first.
        let base = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(
            &ExecutorConfig::default(),
            source_for(&base.path().join("missing")),
        );

        for command in ["", "   ", "\t\n"] {
            let result = runner.execute(command).await;
            assert!(!result.succeeded);
            assert_eq!(result.exit_code, None);
            assert_eq!(result.error_message.as_deref(), Some("empty command"));
        }
    }

    /// A missing workspace fails every call until it is created
    #[tokio::test]
    async fn test_missing_workspace_until_created() {
        init_tracing();
        let base = tempfile::tempdir().unwrap();
        let target = base.path().join("ws");
        let runner = CommandRunner::new(&ExecutorConfig::default(), source_for(&target));

        let first = runner.execute("echo hi").await;
        let second = runner.execute("echo hi").await;

        assert!(!first.succeeded);
        assert_eq!(first.exit_code, None);
        let message = first.error_message.clone().unwrap();
        assert!(message.contains(target.to_str().unwrap()));
        assert!(message.contains("does not exist"));
        assert_eq!(first, second);
        assert!(!target.exists(), "workspace must not be auto-created");

        std::fs::create_dir(&target).unwrap();
        let fixed = runner.execute("echo hi").await;
        assert!(fixed.succeeded);
        assert_eq!(fixed.stdout, "hi\n");
    }

    /// Once resolved, the workspace does not change
    #[tokio::test]
    async fn test_workspace_cached_after_success() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        let first = runner.workspace().await.unwrap().clone();
        let second = runner.workspace().await.unwrap().clone();
        assert_eq!(first, second);
    }

    /// Spawn failure has no exit code and names the shell
    #[tokio::test]
    async fn test_spawn_failure() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir).with_shell(Arc::new(SystemShell::new(
            "/nonexistent/shell",
            vec!["-c".to_string()],
        )));

        let result = runner.execute("echo hi").await;

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None);
        let message = result.error_message.unwrap();
        assert!(message.contains("/nonexistent/shell"), "{message}");

        // The runner keeps working for later calls
        let result = runner.execute("echo again").await;
        assert!(result.error_message.is_some());
    }

    /// The shell strategy is injectable
    #[tokio::test]
    async fn test_injected_shell() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir).with_shell(Arc::new(SystemShell::new("echo", vec![])));

        let result = runner.execute("ls | wc -l").await;

        assert!(result.succeeded);
        assert_eq!(result.stdout, "ls | wc -l\n");
    }

    /// Large output on both streams is captured in full
    #[tokio::test]
    async fn test_large_output_no_deadlock() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        // 2 MiB on each stream, well past any pipe buffer
        let result = runner
            .execute("head -c 2097152 /dev/zero | tr '\\0' a; head -c 2097152 /dev/zero | tr '\\0' b >&2")
            .await;

        assert!(result.succeeded, "{:?}", result.error_message);
        assert_eq!(result.stdout.len(), 2 * 1024 * 1024);
        assert_eq!(result.stderr.len(), 2 * 1024 * 1024);
        assert!(result.stdout.bytes().all(|b| b == b'a'));
        assert!(result.stderr.bytes().all(|b| b == b'b'));
    }

    /// Non-UTF-8 output is replaced, not rejected
    #[tokio::test]
    async fn test_invalid_utf8_output() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir);

        let result = runner.execute("printf 'ok\\377'").await;

        assert!(result.succeeded);
        assert_eq!(result.stdout, "ok\u{FFFD}");
    }

    /// Commands past the deadline are killed and reported
    #[tokio::test]
    async fn test_timeout_reports_and_keeps_partial_output() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir).with_timeout(Duration::from_millis(500));

        let start = std::time::Instant::now();
        let result = runner.execute("echo started; sleep 30").await;

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!result.succeeded);
        assert_eq!(result.error_message.as_deref(), Some("timeout exceeded"));
        assert_eq!(result.stdout, "started\n");
        // SIGKILL'd shell: 128 + 9
        assert_eq!(result.exit_code, Some(137));
    }

    /// Concurrent calls do not mix output
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_isolated() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(create_runner(&dir));

        let a = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                runner
                    .execute("for i in 1 2 3 4 5; do echo alpha; echo ALPHA >&2; sleep 0.05; done")
                    .await
            })
        };
        let b = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                runner
                    .execute("for i in 1 2 3 4 5; do echo beta; echo BETA >&2; sleep 0.05; done; exit 3")
                    .await
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert!(a.succeeded);
        assert_eq!(a.stdout, "alpha\n".repeat(5));
        assert_eq!(a.stderr, "ALPHA\n".repeat(5));

        assert!(!b.succeeded);
        assert_eq!(b.exit_code, Some(3));
        assert_eq!(b.stdout, "beta\n".repeat(5));
        assert_eq!(b.stderr, "BETA\n".repeat(5));
    }

    /// Registry exposes run_command and rejects unknown tools
    #[tokio::test]
    async fn test_registry_dispatch() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let config = ExecutorConfig {
            tools_toml_path: dir.path().join("tools.toml"),
            ..Default::default()
        };
        let runner = Arc::new(CommandRunner::new(&config, source_for(dir.path())));
        let registry = ToolRegistry::init(&config, runner);

        let defs = registry.tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "run_command");
        assert!(!defs[0].description.is_empty());
        assert_eq!(defs[0].input_schema["required"][0], "command");

        let output = registry
            .call("run_command", serde_json::json!({"command": "echo hi; exit 4"}))
            .await
            .unwrap();
        assert!(output.is_error);
        assert!(output.content.contains("[stdout]\nhi\n"));
        assert!(output.content.ends_with("[exit_code]\n4"));
        let structured = output.structured.unwrap();
        assert_eq!(structured["exitCode"], 4);
        assert_eq!(structured["succeeded"], false);

        assert!(matches!(
            registry.call("bash", serde_json::json!({"command": "ls"})).await,
            Err(executor::ExecutorError::UnknownTool(_))
        ));
        assert!(matches!(
            registry.call("run_command", serde_json::json!({"cmd": "ls"})).await,
            Err(executor::ExecutorError::InvalidInput(..))
        ));
    }

    /// tools.toml overrides the default description
    #[tokio::test]
    async fn test_registry_description_override() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("tools.toml");
        std::fs::write(&toml_path, "[run_command]\ndescription = \"custom\"\n").unwrap();
        let config = ExecutorConfig {
            tools_toml_path: toml_path,
            ..Default::default()
        };
        let runner = Arc::new(CommandRunner::new(&config, source_for(dir.path())));
        let registry = ToolRegistry::init(&config, runner);

        assert_eq!(registry.tool_definitions()[0].description, "custom");
    }
}

#[cfg(target_os = "linux")]
mod process_cleanup {
    use super::*;
    use std::path::Path;

    /// True if the pid is gone or only a zombie
    fn is_dead(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => {
                // state is the first field after "(comm)"
                let state = stat
                    .rsplit_once(')')
                    .and_then(|(_, rest)| rest.trim_start().chars().next());
                matches!(state, Some('Z') | Some('X'))
            }
        }
    }

    async fn wait_dead(pid: u32) -> bool {
        for _ in 0..50 {
            if is_dead(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    fn read_pid(path: &Path) -> u32 {
        std::fs::read_to_string(path)
            .unwrap()
            .trim()
            .parse()
            .unwrap()
    }

    async fn wait_for_file(path: &Path) {
        for _ in 0..100 {
            if std::fs::read_to_string(path).is_ok_and(|s| s.ends_with('\n')) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("{} never appeared", path.display());
    }

    /// Streaming megabytes past the deadline: timeout, whole tree killed
    #[tokio::test]
    async fn test_timeout_kills_process_tree() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir).with_timeout(Duration::from_secs(1));

        let result = runner
            .execute(
                "echo $$ > shell.pid; sleep 60 & echo $! > child.pid; \
                 while :; do head -c 1048576 /dev/zero; sleep 0.1; done",
            )
            .await;

        assert!(!result.succeeded);
        assert_eq!(result.error_message.as_deref(), Some("timeout exceeded"));
        assert!(!result.stdout.is_empty(), "partial output should be kept");

        let shell = read_pid(&dir.path().join("shell.pid"));
        let child = read_pid(&dir.path().join("child.pid"));
        assert!(wait_dead(shell).await, "shell {shell} still running");
        assert!(wait_dead(child).await, "background child {child} still running");
    }

    /// A background job that keeps the output pipe open does not hold the
    /// result hostage: the shell's exit status is reported and the job lives on
    #[tokio::test]
    async fn test_background_job_does_not_hold_result() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = create_runner(&dir).with_timeout(Duration::from_secs(5));

        let start = std::time::Instant::now();
        let result = runner
            .execute("sleep 30 & echo $! > child.pid; echo launched")
            .await;

        assert!(start.elapsed() < Duration::from_secs(3));
        assert!(result.succeeded, "{result:?}");
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout, "launched\n");
        assert!(result.error_message.is_none());

        let child = read_pid(&dir.path().join("child.pid"));
        assert!(!is_dead(child), "background job {child} should keep running");
        let _ = std::process::Command::new("kill")
            .arg("-9")
            .arg(child.to_string())
            .status();
    }

    /// Dropping the call future kills the tree as well
    #[tokio::test]
    async fn test_cancellation_kills_process_tree() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(create_runner(&dir));

        let task = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move {
                runner
                    .execute("sleep 60 & echo $! > child.pid; echo $$ > shell.pid; wait")
                    .await
            })
        };

        let shell_pid = dir.path().join("shell.pid");
        wait_for_file(&shell_pid).await;
        let shell = read_pid(&shell_pid);
        let child = read_pid(&dir.path().join("child.pid"));

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert!(wait_dead(shell).await, "shell {shell} still running");
        assert!(wait_dead(child).await, "background child {child} still running");
    }
}
