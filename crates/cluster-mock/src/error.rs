use mongo_cluster::{DataBag, InitiatorError, PeerIdentity, PodSpecSinkError, RelationDataError};
use thiserror::Error;

/// Errors produced by the mock collaborators.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// A unit tried to write a bag it does not own.
    #[error("{writer} may not write {bag}")]
    Forbidden {
        /// The bag that was written.
        bag: DataBag,

        /// The unit that attempted the write.
        writer: PeerIdentity,
    },

    /// Injected failure.
    #[error("injected failure: {0}")]
    Injected(String),
}

impl InitiatorError for Error {}
impl PodSpecSinkError for Error {}
impl RelationDataError for Error {}
