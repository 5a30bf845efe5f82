// Workspace module - resolves the directory every command runs in

pub mod env;
pub mod error;
pub mod resolver;
pub mod types;

pub use env::{ConfigSource, MapSource, SystemEnv};
pub use error::{Result, WorkspaceError};
pub use resolver::{WORKSPACE_ENV_VAR, default_workspace, resolve};
pub use types::WorkspaceConfig;
