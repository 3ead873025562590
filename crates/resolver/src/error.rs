use thiserror::Error;

/// Errors that can occur while looking up a PTR record.
#[derive(Debug, Error)]
pub enum Error {
    /// The system resolver configuration could not be loaded.
    #[error("failed to create DNS resolver: {0}")]
    ResolverInit(String),

    /// The reverse lookup itself failed.
    #[error("reverse lookup of {0} failed: {1}")]
    Lookup(std::net::IpAddr, String),
}
