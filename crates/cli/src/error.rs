use thiserror::Error;

/// Errors that end the hook unsuccessfully.
#[derive(Debug, Error)]
pub enum Error {
    /// Cluster protocol error.
    #[error(transparent)]
    Cluster(#[from] mongo_cluster::Error),

    /// Hook tool error.
    #[error(transparent)]
    HookTools(#[from] mongo_hook_tools::Error),

    /// A unit-scoped relation hook ran without a remote unit.
    #[error("{0} requires JUJU_REMOTE_UNIT")]
    MissingRemoteUnit(String),

    /// The dispatch path has no hook name.
    #[error("no hook name in dispatch path {0:?}")]
    NoHookName(String),

    /// The global subscriber was already set.
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(#[from] tracing::subscriber::SetGlobalDefaultError),
}
