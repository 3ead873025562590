use mongo_cluster::{DataBag, PeerIdentity, PodSpecSinkError, RelationDataError};
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Hook tools can only write the invoking unit's own bag.
    #[error("{unit} may not write {bag}")]
    Forbidden {
        /// The bag that was written.
        bag: DataBag,

        /// The invoking unit.
        unit: PeerIdentity,
    },

    /// A tool printed an address that is not an IP.
    #[error("invalid bind address: {0}")]
    InvalidAddress(String),

    /// IO operation failed.
    #[error("{0}: {1}")]
    Io(&'static str, #[source] std::io::Error),

    /// A tool printed output that could not be parsed.
    #[error("unexpected output from {0}: {1}")]
    Json(&'static str, #[source] serde_json::Error),

    /// A tool exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// Exit status as reported by the OS.
        status: String,

        /// Captured standard error.
        stderr: String,

        /// The tool that failed.
        tool: &'static str,
    },
}

impl PodSpecSinkError for Error {}
impl RelationDataError for Error {}
