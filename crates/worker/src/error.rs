//! Errors raised by the stdio host adapter.

/// Failures that end the adapter loop.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Reading events or writing replies failed.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// A reply could not be encoded.
    #[error("PROTOCOL_ERROR: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The reply writer task died.
    #[error("TASK_FAILED: {0}")]
    Task(#[from] tokio::task::JoinError),
}
