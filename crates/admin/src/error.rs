use mongo_cluster::InitiatorError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The shell exited unsuccessfully.
    #[error("mongosh exited with {status}: {stderr}")]
    CommandFailed {
        /// Exit status as reported by the OS.
        status: String,

        /// Captured standard error.
        stderr: String,
    },

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// The replica set config could not be serialized.
    #[error("failed to serialize replica set config: {0}")]
    Json(#[from] serde_json::Error),
}

impl InitiatorError for Error {}
