// Process-group handling for spawned shells
//
// Every shell is started as the leader of its own process group so that a
// timeout or a dropped call can take down the whole tree, not just `sh`.

use tokio::process::Command;
use tracing::{debug, warn};

/// Put the child into a fresh process group (Unix only).
pub fn isolate(cmd: &mut Command) {
    #[cfg(unix)]
    {
        // SAFETY: setpgid is async-signal-safe and runs between fork and exec.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
    #[cfg(not(unix))]
    {
        let _ = cmd;
    }
}

/// Kills the child's process group when dropped, unless disarmed.
///
/// Covers the cancellation path: if the future running a command is dropped
/// mid-flight, the guard goes with it and the tree is killed.
#[derive(Debug)]
pub struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    /// `pid` is the group leader returned by `Child::id()`.
    pub fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    /// Kill the group now. Later calls and the drop are no-ops.
    pub fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    /// The leader exited normally and was reaped; leave the group alone.
    pub fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            debug!(pgid, "process group guard dropped while armed");
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        warn!(pgid, "process group id out of range");
        return;
    };
    // SAFETY: killpg only sends a signal. The group was created by us via
    // setpgid in isolate() and its leader has not been reaped yet.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "failed to kill process group");
        }
    } else {
        debug!(pgid, "killed process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {
    // No process groups here; the direct child is killed via kill_on_drop.
}
