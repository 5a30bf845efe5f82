//! Configuration sources for workspace resolution.
//!
//! The resolver never touches ambient process state directly; it asks a
//! [`ConfigSource`]. [`SystemEnv`] reads the real process, [`MapSource`] is a
//! fixed snapshot used by tests and by CLI overrides.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Lookups the resolver needs from its environment.
pub trait ConfigSource: Send + Sync {
    /// Get a named configuration value.
    fn var(&self, key: &str) -> Option<OsString>;

    /// Home directory of the running user.
    fn home_dir(&self) -> Option<PathBuf>;

    /// Base directory for relative overrides.
    fn current_dir(&self) -> Option<PathBuf>;
}

/// Reads from the actual process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnv;

impl ConfigSource for SystemEnv {
    fn var(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }
}

/// Fixed in-memory configuration source.
#[allow(dead_code)]
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    vars: HashMap<String, OsString>,
    home: Option<PathBuf>,
    cwd: Option<PathBuf>,
}

#[allow(dead_code)]
impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    #[must_use]
    pub fn with_current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl ConfigSource for MapSource {
    fn var(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }

    fn current_dir(&self) -> Option<PathBuf> {
        self.cwd.clone()
    }
}
