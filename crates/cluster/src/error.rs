use thiserror::Error;

use crate::PeerIdentity;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The coordination channel (relation data) could not be read or written.
    #[error("coordination channel error: {0}")]
    Channel(String),

    /// A value could not be decoded from unit state.
    #[error("failed to decode {0}: {1}")]
    Decode(&'static str, #[source] serde_json::Error),

    /// A value could not be encoded for unit state or the channel.
    #[error("failed to encode {0}: {1}")]
    Encode(&'static str, #[source] serde_json::Error),

    /// A unit without leadership tried to publish cluster-scoped data.
    ///
    /// Only reachable when the leadership predicate was not honoured, so the
    /// hook must fail rather than carry on.
    #[error("unit {0} is not the leader and may not publish cluster configuration")]
    NonLeaderConfigurationAttempt(PeerIdentity),

    /// The workload spec could not be published.
    #[error("pod spec error: {0}")]
    PodSpec(String),

    /// Unit-local state could not be read or written.
    #[error("state store error: {0}")]
    Store(String),
}
