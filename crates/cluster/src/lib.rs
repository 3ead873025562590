//! Peer discovery and one-time replica set bootstrap for a MongoDB
//! application.
//!
//! Each unit keeps a durable [`MembershipStore`] of peer addresses, learns
//! about peers through the relation's data bags via [`CoordinationChannel`],
//! and reacts to lifecycle notifications in [`MembershipProtocol`]. When the
//! membership may have changed, the leader's [`BootstrapCoordinator`]
//! initiates the replica set once and publishes the fact to every peer.
//! [`Unit`] dispatches notifications to all of the above.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

pub mod bootstrap;
pub mod channel;
mod config;
mod context;
mod error;
pub mod membership;
mod notification;
mod peer;
pub mod protocol;
mod queue;
pub mod relation;
mod resolver;
mod unit;
pub mod workload;

#[cfg(test)]
mod test_support;

pub use bootstrap::{
    BootstrapCoordinator, BootstrapOutcome, InitiatorError, ReplSetConfig, ReplSetMember,
    ReplicaSetInitiator,
};
pub use channel::{ClusterInfo, ClusterScopedWriter, CoordinationChannel, PeerScopedWriter};
pub use config::{CharmConfig, DEFAULT_PORT};
pub use context::HookContext;
pub use error::Error;
pub use membership::{MembershipSet, MembershipStore, PeerState};
pub use notification::Notification;
pub use peer::{MemberAddress, PeerIdentity};
pub use protocol::{MembersChanged, MembershipProtocol, Outcome};
pub use queue::DeferredQueue;
pub use relation::{DataBag, RelationData, RelationDataError};
pub use resolver::AddressResolver;
pub use unit::{DispatchReport, Unit, UnitOptions};
pub use workload::{PodSpec, PodSpecSink, PodSpecSinkError, SpecOutcome};
