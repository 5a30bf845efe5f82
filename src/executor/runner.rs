// Command execution core

use crate::executor::config::ExecutorConfig;
use crate::executor::error::{ExecutorError, Result};
use crate::executor::process::{self, ProcessGroupGuard};
use crate::executor::shell::{ShellStrategy, SystemShell};
use crate::executor::types::{CommandRequest, CommandResult};
use crate::workspace::{self, ConfigSource, WorkspaceConfig, WorkspaceError};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// How long to wait for a killed child to be reaped.
const REAP_GRACE: Duration = Duration::from_secs(5);

/// How long to keep reading after the shell exits while a pipe is still open.
const PIPE_GRACE: Duration = Duration::from_millis(250);

/// Runs shell commands with the workspace as working directory.
///
/// The only state kept across calls is the resolved workspace, so one runner
/// can be shared between concurrent callers.
pub struct CommandRunner {
    timeout: Duration,
    shell: Arc<dyn ShellStrategy>,
    source: Arc<dyn ConfigSource>,
    workspace: OnceCell<WorkspaceConfig>,
}

impl CommandRunner {
    pub fn new(config: &ExecutorConfig, source: Arc<dyn ConfigSource>) -> Self {
        debug!(
            timeout_secs = config.timeout_secs,
            shell = %config.shell,
            "initializing command runner"
        );

        Self {
            timeout: config.timeout(),
            shell: Arc::new(SystemShell::new(
                config.shell.clone(),
                config.shell_args.clone(),
            )),
            source,
            workspace: OnceCell::new(),
        }
    }

    /// Replace the shell strategy
    #[allow(dead_code)]
    #[must_use]
    pub fn with_shell(mut self, shell: Arc<dyn ShellStrategy>) -> Self {
        self.shell = shell;
        self
    }

    /// Replace the timeout
    #[allow(dead_code)]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The resolved workspace.
    ///
    /// Success is cached for the runner's lifetime; failures are not, so a
    /// directory created after startup is picked up by the next call.
    pub async fn workspace(&self) -> std::result::Result<&WorkspaceConfig, WorkspaceError> {
        self.workspace
            .get_or_try_init(|| async {
                let resolved = workspace::resolve(self.source.as_ref())?;
                info!(path = %resolved, "workspace resolved");
                Ok::<_, WorkspaceError>(resolved)
            })
            .await
    }

    /// Run `command` and report the outcome.
    #[allow(dead_code)]
    pub async fn execute(&self, command: &str) -> CommandResult {
        self.run(CommandRequest::new(command)).await
    }

    /// Run one request. Never fails: every error is folded into the result.
    pub async fn run(&self, request: CommandRequest) -> CommandResult {
        let start = Instant::now();

        let result = match self.try_run(&request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "command not executed");
                CommandResult::rejected(e.to_string())
            }
        };

        info!(
            command = %request.command.chars().take(100).collect::<String>(),
            duration_ms = start.elapsed().as_millis() as u64,
            exit_code = result.exit_code,
            succeeded = result.succeeded,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "command finished"
        );

        result
    }

    async fn try_run(&self, request: &CommandRequest) -> Result<CommandResult> {
        if request.is_blank() {
            return Err(ExecutorError::EmptyCommand);
        }

        let workspace = self.workspace().await?;

        debug!(command = %request.command, cwd = %workspace, "spawning command");

        let mut cmd = self.shell.command(&request.command);
        cmd.current_dir(workspace.path())
            .env("PWD", workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        process::isolate(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| {
            ExecutorError::SpawnFailed(self.shell.program().to_string(), e.to_string())
        })?;
        let mut guard = ProcessGroupGuard::new(child.id());

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let deadline = tokio::time::Instant::now() + self.timeout;

        // Both pipes are drained while waiting, so a chatty child never
        // blocks on a full pipe buffer. The shell's exit decides the outcome;
        // a background job that inherited a pipe only gets PIPE_GRACE more.
        let waited = {
            let drains = async {
                let (out, err) = tokio::join!(
                    drain(stdout_pipe, &mut stdout),
                    drain(stderr_pipe, &mut stderr),
                );
                out.and(err)
            };
            tokio::pin!(drains);
            let mut drained = None;

            let status = tokio::time::timeout_at(deadline, async {
                tokio::select! {
                    status = child.wait() => status,
                    result = &mut drains => {
                        drained = Some(result);
                        child.wait().await
                    }
                }
            })
            .await;

            match status {
                Ok(status) => {
                    if drained.is_none() {
                        match tokio::time::timeout(PIPE_GRACE, &mut drains).await {
                            Ok(result) => drained = Some(result),
                            Err(_) => {
                                debug!("output pipe still held after shell exit, detaching")
                            }
                        }
                    }
                    Ok((status, drained))
                }
                Err(elapsed) => Err(elapsed),
            }
        };

        match waited {
            Ok((status, drained)) => {
                if status.is_ok() {
                    guard.disarm();
                }
                Ok(settle(status, drained, stdout, stderr))
            }
            Err(_elapsed) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "command timed out, killing process group"
                );
                guard.kill();
                let exit_code = reap(&mut child).await;
                Ok(CommandResult::aborted(
                    ExecutorError::Timeout.to_string(),
                    exit_code,
                    lossy(stdout),
                    lossy(stderr),
                ))
            }
        }
    }
}

/// Build the result for a shell that is no longer being waited on.
///
/// `drained` is `None` when a leftover background job still held a pipe
/// after the grace period; whatever was read until then is kept.
fn settle(
    status: io::Result<ExitStatus>,
    drained: Option<io::Result<()>>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
) -> CommandResult {
    match (status, drained) {
        (Ok(status), None | Some(Ok(()))) => {
            CommandResult::completed(exit_code_of(status), lossy(stdout), lossy(stderr))
        }
        (Ok(status), Some(Err(e))) => CommandResult::aborted(
            ExecutorError::OutputCaptureFailed(e.to_string()).to_string(),
            Some(exit_code_of(status)),
            lossy(stdout),
            lossy(stderr),
        ),
        (Err(e), _) => CommandResult::aborted(
            ExecutorError::OutputCaptureFailed(e.to_string()).to_string(),
            None,
            lossy(stdout),
            lossy(stderr),
        ),
    }
}

/// Read `pipe` to EOF, appending to `buf` as data arrives.
///
/// Appends chunk by chunk so that output read before a timeout survives the
/// cancellation of this future.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

/// Kill the direct child (for platforms without process groups) and reap it.
async fn reap(child: &mut Child) -> Option<i32> {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "start_kill after timeout");
    }
    match tokio::time::timeout(REAP_GRACE, child.wait()).await {
        Ok(Ok(status)) => Some(exit_code_of(status)),
        Ok(Err(e)) => {
            warn!(error = %e, "failed to reap timed-out child");
            None
        }
        Err(_) => {
            warn!("timed-out child was not reaped in time");
            None
        }
    }
}

/// Exit status as an integer; signal deaths map to `128 + signal` like a shell.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn lossy(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
