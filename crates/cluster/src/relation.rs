//! Abstract interface for the peer relation's data bags.

use std::error::Error;
use std::fmt::{self, Debug};

use async_trait::async_trait;

use crate::PeerIdentity;

/// Marker trait for `RelationData` errors
pub trait RelationDataError: Debug + Error + Send + Sync + 'static {}

/// One of the key-value bags carried by the peer relation.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataBag {
    /// Bag owned by a single unit. Only that unit may write it.
    Unit(PeerIdentity),

    /// Bag shared by the whole application. Only the leader may write it.
    Application(String),
}

impl fmt::Display for DataBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(unit) => write!(f, "unit:{unit}"),
            Self::Application(app) => write!(f, "app:{app}"),
        }
    }
}

/// The orchestration layer's relation transport: an eventually-consistent
/// multi-writer key-value exchange.
///
/// No propagation bound is assumed. A read may return stale data or nothing
/// at all for a value another unit has already written.
#[async_trait]
pub trait RelationData: Clone + Send + Sync + 'static {
    /// The error type for relation operations.
    type Error: RelationDataError;

    /// Read a key from a bag.
    async fn get(&self, bag: &DataBag, key: &str) -> Result<Option<String>, Self::Error>;

    /// Write a key into a bag.
    async fn set(&self, bag: &DataBag, key: &str, value: &str) -> Result<(), Self::Error>;
}
