// Error types for Workspace module

use std::path::PathBuf;
use thiserror::Error;

/// Workspace configuration errors.
///
/// `Clone` so the same failure can be reported on every call until an
/// operator fixes the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error(
        "workspace directory '{}' does not exist; create it or set {var} to an existing directory",
        path.display()
    )]
    NotFound { path: PathBuf, var: &'static str },

    #[error(
        "workspace path '{}' is not a directory; point {var} at a directory",
        path.display()
    )]
    NotADirectory { path: PathBuf, var: &'static str },

    #[error("cannot determine the home directory for the default workspace; set {var}")]
    HomeUnavailable { var: &'static str },

    #[error("cannot resolve workspace path '{}': {reason}", path.display())]
    Unresolvable { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
