//! Shared harness: simulated units talking through one in-memory relation.
#![allow(dead_code)]

use mongo_cluster::{
    CharmConfig, DispatchReport, HookContext, MembershipStore, Notification, PeerIdentity, Unit,
    UnitOptions,
};
use mongo_cluster_mock::{
    MemoryRelation, MemoryRelationHub, RecordingInitiator, RecordingPodSpecSink, StaticResolver,
};
use mongo_store_memory::MemoryStore;

pub type TestUnit =
    Unit<MemoryStore, MemoryRelation, StaticResolver, RecordingInitiator, RecordingPodSpecSink>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// The reverse-DNS name a pod gets once its endpoints service exists.
pub fn endpoint(n: u8) -> String {
    format!("10-1-0-{n}.mongo-endpoints.db.svc.cluster.local")
}

pub struct TestPeer {
    pub config: CharmConfig,
    pub hub: MemoryRelationHub,
    pub identity: PeerIdentity,
    pub initiator: RecordingInitiator,
    pub is_leader: bool,
    pub resolver: StaticResolver,
    pub sink: RecordingPodSpecSink,
    pub store: MemoryStore,
    pub unit: TestUnit,
}

impl TestPeer {
    pub fn new(hub: &MemoryRelationHub, name: &str, address: Option<&str>, is_leader: bool) -> Self {
        let identity = PeerIdentity::new(name);
        let initiator = RecordingInitiator::new();
        let resolver = address.map_or_else(StaticResolver::unresolved, StaticResolver::resolved);
        let sink = RecordingPodSpecSink::new();
        let store = MemoryStore::new();

        let unit = Unit::new(UnitOptions {
            identity: identity.clone(),
            initiator: initiator.clone(),
            pod_spec_sink: sink.clone(),
            relation: hub.view(identity.clone()),
            resolver: resolver.clone(),
            store: store.clone(),
        });

        Self {
            config: CharmConfig::default(),
            hub: hub.clone(),
            identity,
            initiator,
            is_leader,
            resolver,
            sink,
            store,
            unit,
        }
    }

    pub fn ctx(&self) -> HookContext {
        HookContext::new(self.is_leader, self.config.clone())
    }

    pub async fn dispatch(&mut self, notification: Notification) -> DispatchReport {
        let ctx = self.ctx();
        self.unit.dispatch(&ctx, notification).await.unwrap()
    }

    pub async fn joined(&mut self, peer: &str) -> DispatchReport {
        self.dispatch(Notification::PeerJoined(peer.into())).await
    }

    pub async fn updated(&mut self, peer: &str) -> DispatchReport {
        self.dispatch(Notification::PeerUpdated(peer.into())).await
    }

    pub async fn departed(&mut self, peer: &str) -> DispatchReport {
        self.dispatch(Notification::PeerDeparted(peer.into())).await
    }

    /// Recorded membership, without lazily resolving this unit.
    pub async fn recorded_members(&self) -> Vec<(String, String)> {
        let store = MembershipStore::new(
            self.identity.clone(),
            self.store.clone(),
            StaticResolver::unresolved(),
        );
        let members = store.members().await.unwrap();

        members
            .iter()
            .map(|(peer, address)| (peer.to_string(), address.to_string()))
            .collect()
    }

    /// Simulate a process restart: same durable state, fresh unit.
    pub fn restart(&mut self) {
        self.unit = Unit::new(UnitOptions {
            identity: self.identity.clone(),
            initiator: self.initiator.clone(),
            pod_spec_sink: self.sink.clone(),
            relation: self.hub.view(self.identity.clone()),
            resolver: self.resolver.clone(),
            store: self.store.clone(),
        });
    }
}

/// Two ready units that have exchanged joins: `mongo/0` leads.
pub async fn joined_pair(hub: &MemoryRelationHub) -> (TestPeer, TestPeer) {
    let mut a = TestPeer::new(hub, "mongo/0", Some(endpoint(1).as_str()), true);
    let mut b = TestPeer::new(hub, "mongo/1", Some(endpoint(2).as_str()), false);

    a.joined("mongo/1").await;
    b.joined("mongo/0").await;

    (a, b)
}
