//! Durable, unit-local view of cluster membership.

use bytes::Bytes;
use indexmap::IndexMap;
use mongo_store::Store;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{AddressResolver, Error, MemberAddress, PeerIdentity};

const CONFIGURED_KEY: &str = "replset-configured";
const MEMBERS_KEY: &str = "members";
const PENDING_KEY: &str = "pending-peers";

/// Ordered mapping of peer identity to advertised address.
///
/// Iteration follows insertion order. Overwriting an existing peer keeps its
/// position and removing a peer keeps the relative order of the rest, so
/// member indices derived from the order stay reproducible.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipSet(IndexMap<PeerIdentity, MemberAddress>);

impl MembershipSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `peer` has a known address.
    #[must_use]
    pub fn contains(&self, peer: &PeerIdentity) -> bool {
        self.0.contains_key(peer)
    }

    /// The address recorded for `peer`.
    #[must_use]
    pub fn get(&self, peer: &PeerIdentity) -> Option<&MemberAddress> {
        self.0.get(peer)
    }

    /// Records `address` for `peer`, returning the previous address.
    pub fn insert(&mut self, peer: PeerIdentity, address: MemberAddress) -> Option<MemberAddress> {
        self.0.insert(peer, address)
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PeerIdentity, &MemberAddress)> {
        self.0.iter()
    }

    /// Number of peers with a known address.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Drops `peer`, returning its address.
    pub fn remove(&mut self, peer: &PeerIdentity) -> Option<MemberAddress> {
        self.0.shift_remove(peer)
    }
}

impl FromIterator<(PeerIdentity, MemberAddress)> for MembershipSet {
    fn from_iter<T: IntoIterator<Item = (PeerIdentity, MemberAddress)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Where a peer stands from this unit's point of view.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerState {
    /// Nothing is known about the peer.
    Unknown,

    /// The peer is present but has not advertised an address yet.
    AddressPending,

    /// The peer's address is in the membership set.
    AddressKnown,
}

/// Membership set and configured-flag observation, persisted in unit state.
///
/// Each operation reads and writes the backing store, so the view survives
/// hook invocations and process restarts.
#[derive(Clone, Debug)]
pub struct MembershipStore<S, R> {
    local: PeerIdentity,
    resolver: R,
    store: S,
}

impl<S, R> MembershipStore<S, R>
where
    S: Store,
    R: AddressResolver,
{
    /// Creates a membership store for the unit `local`.
    pub const fn new(local: PeerIdentity, store: S, resolver: R) -> Self {
        Self {
            local,
            resolver,
            store,
        }
    }

    /// The identity of this unit.
    pub const fn local(&self) -> &PeerIdentity {
        &self.local
    }

    /// Resolve this unit's address afresh, bypassing the cache.
    pub async fn resolve_own_address(&self) -> Option<MemberAddress> {
        self.resolver.resolve_own_address().await
    }

    /// The recorded address of `peer`, without lazy resolution.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read.
    pub async fn get(&self, peer: &PeerIdentity) -> Result<Option<MemberAddress>, Error> {
        Ok(self.load_members().await?.get(peer).cloned())
    }

    /// Record `address` for `peer`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read or written.
    pub async fn set(
        &self,
        peer: &PeerIdentity,
        address: MemberAddress,
    ) -> Result<Option<MemberAddress>, Error> {
        let mut members = self.load_members().await?;
        let previous = members.insert(peer.clone(), address);
        self.save(MEMBERS_KEY, "membership set", &members).await?;
        self.clear_pending(peer).await?;

        Ok(previous)
    }

    /// Forget `peer` entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read or written.
    pub async fn remove(&self, peer: &PeerIdentity) -> Result<Option<MemberAddress>, Error> {
        let mut members = self.load_members().await?;
        let removed = members.remove(peer);
        if removed.is_some() {
            self.save(MEMBERS_KEY, "membership set", &members).await?;
        }
        self.clear_pending(peer).await?;

        Ok(removed)
    }

    /// The address of `peer`. For this unit a missing address is resolved
    /// and cached before it is returned. An unresolved address is not
    /// cached, so the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read or written.
    pub async fn fqdn_for(&self, peer: &PeerIdentity) -> Result<Option<MemberAddress>, Error> {
        if let Some(address) = self.get(peer).await? {
            return Ok(Some(address));
        }

        if *peer != self.local {
            return Ok(None);
        }

        match self.resolver.resolve_own_address().await {
            Some(address) => {
                debug!("caching own address {}", address);
                self.set(peer, address.clone()).await?;
                Ok(Some(address))
            }
            None => Ok(None),
        }
    }

    /// The full membership set, with this unit lazily included.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read or written.
    pub async fn members(&self) -> Result<MembershipSet, Error> {
        let local = self.local.clone();
        self.fqdn_for(&local).await?;
        self.load_members().await
    }

    /// Note that `peer` is present even though its address is not known yet.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read or written.
    pub async fn acknowledge(&self, peer: &PeerIdentity) -> Result<(), Error> {
        if self.load_members().await?.contains(peer) {
            return Ok(());
        }

        let mut pending: Vec<PeerIdentity> = self.load(PENDING_KEY, "pending peers").await?;
        if !pending.contains(peer) {
            pending.push(peer.clone());
            self.save(PENDING_KEY, "pending peers", &pending).await?;
        }

        Ok(())
    }

    /// Where `peer` stands.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read.
    pub async fn peer_state(&self, peer: &PeerIdentity) -> Result<PeerState, Error> {
        if self.load_members().await?.contains(peer) {
            return Ok(PeerState::AddressKnown);
        }

        let pending: Vec<PeerIdentity> = self.load(PENDING_KEY, "pending peers").await?;
        if pending.contains(peer) {
            Ok(PeerState::AddressPending)
        } else {
            Ok(PeerState::Unknown)
        }
    }

    /// Whether this unit has already seen the replica set configured.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be read.
    pub async fn is_configured(&self) -> Result<bool, Error> {
        self.load(CONFIGURED_KEY, "configured flag").await
    }

    /// Remember that the replica set is configured. The observation is never
    /// reverted.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be written.
    pub async fn mark_configured(&self) -> Result<(), Error> {
        if !self.is_configured().await? {
            info!("recording replica set as configured");
            self.save(CONFIGURED_KEY, "configured flag", &true).await?;
        }

        Ok(())
    }

    async fn clear_pending(&self, peer: &PeerIdentity) -> Result<(), Error> {
        let mut pending: Vec<PeerIdentity> = self.load(PENDING_KEY, "pending peers").await?;
        let before = pending.len();
        pending.retain(|p| p != peer);
        if pending.len() != before {
            self.save(PENDING_KEY, "pending peers", &pending).await?;
        }

        Ok(())
    }

    async fn load_members(&self) -> Result<MembershipSet, Error> {
        self.load(MEMBERS_KEY, "membership set").await
    }

    async fn load<T>(&self, key: &'static str, what: &'static str) -> Result<T, Error>
    where
        T: DeserializeOwned + Default,
    {
        match self
            .store
            .get(key)
            .await
            .map_err(|e| Error::Store(e.to_string()))?
        {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::Decode(what, e)),
            None => Ok(T::default()),
        }
    }

    async fn save<T>(&self, key: &'static str, what: &'static str, value: &T) -> Result<(), Error>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_vec(value).map_err(|e| Error::Encode(what, e))?;

        self.store
            .put(key, Bytes::from(encoded))
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }
}
