//! In-memory collaborators for exercising the cluster core without an
//! orchestration layer or a running `mongod`.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod relation;

pub use error::Error;
pub use relation::{MemoryRelation, MemoryRelationHub, RelationWrite};

use std::sync::Arc;

use async_trait::async_trait;
use mongo_cluster::{
    AddressResolver, MemberAddress, PodSpec, PodSpecSink, ReplSetConfig, ReplicaSetInitiator,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Resolver returning whatever address it was last given.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    address: Arc<Mutex<Option<MemberAddress>>>,
}

impl StaticResolver {
    /// A resolver with no address yet.
    #[must_use]
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// A resolver answering `address`.
    #[must_use]
    pub fn resolved(address: &str) -> Self {
        Self {
            address: Arc::new(Mutex::new(MemberAddress::parse(address))),
        }
    }

    /// Change the answer.
    pub async fn set(&self, address: Option<&str>) {
        *self.address.lock().await = address.and_then(MemberAddress::parse);
    }
}

#[async_trait]
impl AddressResolver for StaticResolver {
    async fn resolve_own_address(&self) -> Option<MemberAddress> {
        self.address.lock().await.clone()
    }
}

/// A recorded `replSetInitiate` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitiateCall {
    /// The config that was sent.
    pub config: ReplSetConfig,

    /// The member the call was sent to.
    pub target: MemberAddress,
}

/// Initiator that records calls and optionally fails them.
#[derive(Clone, Debug, Default)]
pub struct RecordingInitiator {
    calls: Arc<Mutex<Vec<InitiateCall>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingInitiator {
    /// Creates an initiator whose calls succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with `message`, or succeed again with
    /// `None`.
    pub async fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().await = message.map(ToString::to_string);
    }

    /// Every call made so far.
    pub async fn calls(&self) -> Vec<InitiateCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ReplicaSetInitiator for RecordingInitiator {
    type Error = Error;

    async fn initiate(
        &self,
        target: &MemberAddress,
        config: &ReplSetConfig,
    ) -> Result<(), Self::Error> {
        debug!("recording replSetInitiate via {}", target);

        self.calls.lock().await.push(InitiateCall {
            config: config.clone(),
            target: target.clone(),
        });

        match self.failure.lock().await.clone() {
            Some(message) => Err(Error::Injected(message)),
            None => Ok(()),
        }
    }
}

/// Spec sink that keeps every published spec.
#[derive(Clone, Debug, Default)]
pub struct RecordingPodSpecSink {
    specs: Arc<Mutex<Vec<PodSpec>>>,
}

impl RecordingPodSpecSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spec published so far.
    pub async fn specs(&self) -> Vec<PodSpec> {
        self.specs.lock().await.clone()
    }
}

#[async_trait]
impl PodSpecSink for RecordingPodSpecSink {
    type Error = Error;

    async fn set_spec(&self, spec: &PodSpec) -> Result<(), Self::Error> {
        self.specs.lock().await.push(spec.clone());
        Ok(())
    }
}
