// Workspace resolution

use crate::workspace::env::ConfigSource;
use crate::workspace::error::{Result, WorkspaceError};
use crate::workspace::types::WorkspaceConfig;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the workspace override value.
pub const WORKSPACE_ENV_VAR: &str = "MCP_WORKSPACE";

/// Default workspace location for a given home directory.
pub fn default_workspace(home: &Path) -> PathBuf {
    home.join("mcp").join("workspace")
}

/// Resolve the workspace directory from `source`.
///
/// A non-blank `MCP_WORKSPACE` wins; relative values are taken against the
/// source's current directory. Otherwise `<home>/mcp/workspace` is used.
/// The result is canonicalized, so symlinks, `..` and trailing separators are
/// all normalized away. The directory is never created here.
pub fn resolve(source: &dyn ConfigSource) -> Result<WorkspaceConfig> {
    let candidate = match override_path(source) {
        Some(path) => absolutize(path, source)?,
        None => {
            let home = source.home_dir().ok_or(WorkspaceError::HomeUnavailable {
                var: WORKSPACE_ENV_VAR,
            })?;
            default_workspace(&home)
        }
    };

    debug!(path = %candidate.display(), "validating workspace candidate");
    validate(candidate)
}

fn override_path(source: &dyn ConfigSource) -> Option<PathBuf> {
    let raw = source.var(WORKSPACE_ENV_VAR)?;
    match raw.to_str() {
        Some(s) if s.trim().is_empty() => None,
        Some(s) => Some(PathBuf::from(s.trim())),
        // Non-UTF-8 paths are taken verbatim.
        None => Some(PathBuf::from(raw)),
    }
}

fn absolutize(path: PathBuf, source: &dyn ConfigSource) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    match source.current_dir() {
        Some(cwd) => Ok(cwd.join(path)),
        None => Err(WorkspaceError::Unresolvable {
            path,
            reason: "relative path and no current directory to anchor it".to_string(),
        }),
    }
}

fn validate(path: PathBuf) -> Result<WorkspaceConfig> {
    let metadata = match std::fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(WorkspaceError::NotFound {
                path,
                var: WORKSPACE_ENV_VAR,
            });
        }
        Err(e) => {
            return Err(WorkspaceError::Unresolvable {
                path,
                reason: e.to_string(),
            });
        }
    };

    if !metadata.is_dir() {
        return Err(WorkspaceError::NotADirectory {
            path,
            var: WORKSPACE_ENV_VAR,
        });
    }

    let canonical = std::fs::canonicalize(&path).map_err(|e| WorkspaceError::Unresolvable {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(WorkspaceConfig::new(canonical))
}
