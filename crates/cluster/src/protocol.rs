//! Reactions to peer lifecycle notifications.

use mongo_store::Store;
use tracing::{debug, info};

use crate::relation::RelationData;
use crate::{AddressResolver, CharmConfig, CoordinationChannel, Error, MembershipStore, PeerIdentity};

/// Signal that the membership set may have changed and the bootstrap
/// coordinator should look at it again. Carries no payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MembersChanged;

/// What became of a notification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// A precondition is not met yet. The notification must be delivered
    /// again later; nothing was changed.
    Deferred,

    /// The notification was handled, optionally raising a signal.
    Completed(Option<MembersChanged>),
}

impl Outcome {
    /// Whether the notification raised [`MembersChanged`].
    #[must_use]
    pub const fn members_changed(self) -> bool {
        matches!(self, Self::Completed(Some(MembersChanged)))
    }
}

/// Membership state machine for one unit.
///
/// Borrows the unit's state for the duration of a single notification.
#[derive(Debug)]
pub struct MembershipProtocol<'a, S, R, D> {
    channel: &'a CoordinationChannel<D>,
    config: &'a CharmConfig,
    store: &'a MembershipStore<S, R>,
}

impl<'a, S, R, D> MembershipProtocol<'a, S, R, D>
where
    S: Store,
    R: AddressResolver,
    D: RelationData,
{
    /// Binds the protocol to a unit's state.
    pub const fn new(
        store: &'a MembershipStore<S, R>,
        channel: &'a CoordinationChannel<D>,
        config: &'a CharmConfig,
    ) -> Self {
        Self {
            channel,
            config,
            store,
        }
    }

    /// Another unit joined the relation. Advertise our own address, or defer
    /// until the workload endpoint is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state or the relation cannot be accessed.
    pub async fn on_peer_joined(&self, peer: &PeerIdentity) -> Result<Outcome, Error> {
        let Some(address) = self.store.resolve_own_address().await else {
            debug!("own address unresolved, deferring join of {}", peer);
            return Ok(Outcome::Deferred);
        };

        if !self.config.endpoint_ready(&address) {
            debug!(
                "endpoint {} not ready yet, deferring join of {}",
                address, peer
            );
            return Ok(Outcome::Deferred);
        }

        let local = self.store.local();
        info!("{} joined; advertising {} for {}", peer, address, local);

        self.store.set(local, address.clone()).await?;
        self.channel.peer_writer().publish_address(&address).await?;

        if peer != local {
            self.store.acknowledge(peer).await?;
        }

        Ok(Outcome::Completed(None))
    }

    /// A peer's bag changed. The relation is the source of truth: whatever
    /// address it carries overwrites the local record, and the signal is
    /// raised even when nothing seems to differ.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state or the relation cannot be accessed.
    pub async fn on_peer_updated(&self, peer: &PeerIdentity) -> Result<Outcome, Error> {
        match self.channel.peer_address(peer).await? {
            Some(address) => {
                let previous = self.store.set(peer, address.clone()).await?;
                if previous.as_ref() == Some(&address) {
                    debug!("{} still advertises {}", peer, address);
                } else {
                    info!("{} advertises {}", peer, address);
                }
            }
            None => {
                debug!("{} has not advertised an address yet", peer);
                self.store.acknowledge(peer).await?;
            }
        }

        Ok(Outcome::Completed(Some(MembersChanged)))
    }

    /// A peer left the relation.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be accessed.
    pub async fn on_peer_departed(&self, peer: &PeerIdentity) -> Result<Outcome, Error> {
        match self.store.remove(peer).await? {
            Some(address) => {
                info!("{} at {} departed", peer, address);
                Ok(Outcome::Completed(Some(MembersChanged)))
            }
            None => {
                debug!("{} departed without a recorded address", peer);
                Ok(Outcome::Completed(None))
            }
        }
    }

    /// The application bag changed. Only the configured flag lives there;
    /// a published `true` is cached locally.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state or the relation cannot be accessed.
    pub async fn on_cluster_updated(&self) -> Result<Outcome, Error> {
        if self.channel.cluster_info().await?.repl_set_configured {
            self.store.mark_configured().await?;
        }

        Ok(Outcome::Completed(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongo_store_memory::MemoryStore;

    use crate::relation::DataBag;
    use crate::test_support::{FakeRelation, FakeResolver};
    use crate::{MemberAddress, PeerState};

    struct Harness {
        channel: CoordinationChannel<FakeRelation>,
        config: CharmConfig,
        relation: FakeRelation,
        resolver: FakeResolver,
        store: MembershipStore<MemoryStore, FakeResolver>,
    }

    impl Harness {
        fn new(unit: &str) -> Self {
            let relation = FakeRelation::default();
            let resolver = FakeResolver::unresolved();

            Self {
                channel: CoordinationChannel::new(relation.clone(), PeerIdentity::new(unit)),
                config: CharmConfig::default(),
                relation,
                resolver: resolver.clone(),
                store: MembershipStore::new(PeerIdentity::new(unit), MemoryStore::new(), resolver),
            }
        }

        fn protocol(&self) -> MembershipProtocol<'_, MemoryStore, FakeResolver, FakeRelation> {
            MembershipProtocol::new(&self.store, &self.channel, &self.config)
        }

        async fn advertise(&self, peer: &str, address: &str) {
            self.relation
                .set(&DataBag::Unit(peer.into()), "fqdn", address)
                .await
                .unwrap();
        }
    }

    fn address(name: &str) -> MemberAddress {
        MemberAddress::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_join_defers_without_address() {
        let harness = Harness::new("mongo/0");

        let outcome = harness
            .protocol()
            .on_peer_joined(&"mongo/1".into())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Deferred);
        assert!(harness.store.get(&"mongo/0".into()).await.unwrap().is_none());
        assert_eq!(
            harness.store.peer_state(&"mongo/1".into()).await.unwrap(),
            PeerState::Unknown
        );
        assert_eq!(
            harness.relation.raw(&DataBag::Unit("mongo/0".into()), "fqdn"),
            None
        );
    }

    #[tokio::test]
    async fn test_join_defers_until_endpoint_ready() {
        let harness = Harness::new("mongo/0");
        harness.resolver.set(MemberAddress::parse("mongo-0.db.svc"));

        let outcome = harness
            .protocol()
            .on_peer_joined(&"mongo/1".into())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Deferred);
        assert!(harness.store.get(&"mongo/0".into()).await.unwrap().is_none());
        assert_eq!(
            harness.relation.raw(&DataBag::Unit("mongo/0".into()), "fqdn"),
            None
        );
    }

    #[tokio::test]
    async fn test_join_advertises_own_address() {
        let harness = Harness::new("mongo/0");
        harness
            .resolver
            .set(MemberAddress::parse("a.mongo-endpoints.db.svc"));

        let outcome = harness
            .protocol()
            .on_peer_joined(&"mongo/1".into())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed(None));
        assert_eq!(
            harness.store.get(&"mongo/0".into()).await.unwrap(),
            Some(address("a.mongo-endpoints.db.svc"))
        );
        assert_eq!(
            harness.relation.raw(&DataBag::Unit("mongo/0".into()), "fqdn"),
            Some("a.mongo-endpoints.db.svc".to_string())
        );
        assert_eq!(
            harness.store.peer_state(&"mongo/1".into()).await.unwrap(),
            PeerState::AddressPending
        );
    }

    #[tokio::test]
    async fn test_update_always_signals_and_overwrites() {
        let harness = Harness::new("mongo/0");
        let peer = PeerIdentity::new("mongo/1");

        let outcome = harness.protocol().on_peer_updated(&peer).await.unwrap();
        assert!(outcome.members_changed());
        assert_eq!(
            harness.store.peer_state(&peer).await.unwrap(),
            PeerState::AddressPending
        );

        harness.advertise("mongo/1", "b.mongo-endpoints").await;
        assert!(
            harness
                .protocol()
                .on_peer_updated(&peer)
                .await
                .unwrap()
                .members_changed()
        );
        assert!(
            harness
                .protocol()
                .on_peer_updated(&peer)
                .await
                .unwrap()
                .members_changed()
        );
        assert_eq!(
            harness.store.get(&peer).await.unwrap(),
            Some(address("b.mongo-endpoints"))
        );

        harness.advertise("mongo/1", "b2.mongo-endpoints").await;
        harness.protocol().on_peer_updated(&peer).await.unwrap();
        assert_eq!(
            harness.store.get(&peer).await.unwrap(),
            Some(address("b2.mongo-endpoints"))
        );
    }

    #[tokio::test]
    async fn test_departure_of_unknown_peer_is_quiet() {
        let harness = Harness::new("mongo/0");
        let peer = PeerIdentity::new("mongo/1");

        assert_eq!(
            harness.protocol().on_peer_departed(&peer).await.unwrap(),
            Outcome::Completed(None)
        );

        harness.advertise("mongo/1", "b.mongo-endpoints").await;
        harness.protocol().on_peer_updated(&peer).await.unwrap();

        assert!(
            harness
                .protocol()
                .on_peer_departed(&peer)
                .await
                .unwrap()
                .members_changed()
        );
        assert_eq!(harness.store.get(&peer).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cluster_update_caches_configured_flag() {
        let harness = Harness::new("mongo/1");

        harness.protocol().on_cluster_updated().await.unwrap();
        assert!(!harness.store.is_configured().await.unwrap());

        harness
            .relation
            .set(
                &DataBag::Application("mongo".to_string()),
                "info",
                r#"{"replSetConfigured": true}"#,
            )
            .await
            .unwrap();
        harness.protocol().on_cluster_updated().await.unwrap();
        assert!(harness.store.is_configured().await.unwrap());
    }
}
