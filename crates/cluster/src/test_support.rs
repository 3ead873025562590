//! In-crate doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use crate::relation::{DataBag, RelationData, RelationDataError};
use crate::{AddressResolver, InitiatorError, MemberAddress, ReplSetConfig, ReplicaSetInitiator};

#[derive(Clone, Default)]
pub struct FakeResolver {
    address: Arc<Mutex<Option<MemberAddress>>>,
    calls: Arc<AtomicUsize>,
    misses: usize,
}

impl FakeResolver {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn resolved(address: &str) -> Self {
        let resolver = Self::default();
        resolver.set(MemberAddress::parse(address));
        resolver
    }

    /// Answers `None` to the first `misses` lookups.
    pub fn resolved_after(misses: usize, address: &str) -> Self {
        let mut resolver = Self::resolved(address);
        resolver.misses = misses;
        resolver
    }

    pub fn set(&self, address: Option<MemberAddress>) {
        *self.address.lock().unwrap() = address;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressResolver for FakeResolver {
    async fn resolve_own_address(&self) -> Option<MemberAddress> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.misses {
            return None;
        }
        self.address.lock().unwrap().clone()
    }
}

#[derive(Debug, Error)]
#[error("fake relation error")]
pub struct FakeRelationError;

impl RelationDataError for FakeRelationError {}

#[derive(Clone, Debug, Default)]
pub struct FakeRelation {
    bags: Arc<Mutex<HashMap<(DataBag, String), String>>>,
}

impl FakeRelation {
    pub fn raw(&self, bag: &DataBag, key: &str) -> Option<String> {
        self.bags
            .lock()
            .unwrap()
            .get(&(bag.clone(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl RelationData for FakeRelation {
    type Error = FakeRelationError;

    async fn get(&self, bag: &DataBag, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.raw(bag, key))
    }

    async fn set(&self, bag: &DataBag, key: &str, value: &str) -> Result<(), Self::Error> {
        self.bags
            .lock()
            .unwrap()
            .insert((bag.clone(), key.to_string()), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("fake initiator error")]
pub struct FakeInitiatorError;

impl InitiatorError for FakeInitiatorError {}

#[derive(Clone, Default)]
pub struct FakeInitiator {
    calls: Arc<Mutex<Vec<(MemberAddress, ReplSetConfig)>>>,
}

impl FakeInitiator {
    pub fn calls(&self) -> Vec<(MemberAddress, ReplSetConfig)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplicaSetInitiator for FakeInitiator {
    type Error = FakeInitiatorError;

    async fn initiate(
        &self,
        target: &MemberAddress,
        config: &ReplSetConfig,
    ) -> Result<(), Self::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((target.clone(), config.clone()));
        Ok(())
    }
}
