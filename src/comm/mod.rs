// Comm module - line-delimited JSON-RPC 2.0 over stdio
// stdout carries protocol messages only; logs go to stderr

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod types;

pub use config::CommConfig;
pub use error::{CommError, Result};
pub use server::Comm;
