// Shell interpretation strategy

use tokio::process::Command;

/// Decides which program interprets a command line, and how.
///
/// Tests swap this out to control exactly what gets spawned.
pub trait ShellStrategy: Send + Sync + std::fmt::Debug {
    /// Program name, used in logs and spawn errors
    fn program(&self) -> &str;

    /// Build an unconfigured process that will run `command`
    fn command(&self, command: &str) -> Command;
}

/// Runs commands as `<program> <args..> <command>`, e.g. `/bin/sh -c "ls | wc -l"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemShell {
    program: String,
    args: Vec<String>,
}

impl SystemShell {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// POSIX `sh -c`
    pub fn posix() -> Self {
        Self::new("/bin/sh", vec!["-c".to_string()])
    }

    /// Windows `cmd /C`
    pub fn cmd() -> Self {
        Self::new("cmd", vec!["/C".to_string()])
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for SystemShell {
    fn default() -> Self {
        if cfg!(windows) {
            Self::cmd()
        } else {
            Self::posix()
        }
    }
}

impl ShellStrategy for SystemShell {
    fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(command);
        cmd
    }
}
