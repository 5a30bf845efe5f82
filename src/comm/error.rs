use thiserror::Error;

/// Comm module runtime errors
#[derive(Debug, Error)]
pub enum CommError {
    #[error("Failed to read from input: {0}")]
    Read(String),

    #[error("Failed to write to output: {0}")]
    Write(String),

    #[error("Failed to encode message: {0}")]
    Encode(String),

    #[error("Line too large: {0} bytes")]
    LineTooLong(usize),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for comm operations
pub type Result<T> = std::result::Result<T, CommError>;
