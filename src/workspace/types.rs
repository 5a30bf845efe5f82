// Data types for Workspace module

use std::path::{Path, PathBuf};

/// The resolved execution root.
///
/// Only [`resolve`](crate::workspace::resolve) builds one, so holding a
/// `WorkspaceConfig` means the path was an existing directory when it was
/// resolved. The path is absolute and canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    path: PathBuf,
}

impl WorkspaceConfig {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Display for WorkspaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
