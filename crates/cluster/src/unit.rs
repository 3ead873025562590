//! Per-unit dispatcher tying the protocol, the coordinator and the workload
//! spec together.

use mongo_store::Store;
use tracing::{debug, info};

use crate::bootstrap::{BootstrapCoordinator, BootstrapOutcome, ReplicaSetInitiator};
use crate::protocol::{MembershipProtocol, Outcome};
use crate::relation::RelationData;
use crate::workload::{ApplyMode, PodSpecSink, SpecOutcome, WorkloadManager};
use crate::{
    AddressResolver, CoordinationChannel, DeferredQueue, Error, HookContext, MembershipStore,
    Notification, PeerIdentity,
};

/// Collaborators a [`Unit`] is built from.
pub struct UnitOptions<S, D, R, I, P> {
    /// This unit's identity.
    pub identity: PeerIdentity,

    /// Issues `replSetInitiate`.
    pub initiator: I,

    /// Publishes the workload spec.
    pub pod_spec_sink: P,

    /// Peer relation transport.
    pub relation: D,

    /// Resolves this unit's own address.
    pub resolver: R,

    /// Durable unit-local state.
    pub store: S,
}

/// What a dispatch did.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DispatchReport {
    /// Outcome of every bootstrap pass that ran, in order.
    pub bootstrap: Vec<BootstrapOutcome>,

    /// Notifications left waiting for redelivery.
    pub deferred: Vec<Notification>,

    /// Outcome of the last workload spec application, if one ran.
    pub pod_spec: Option<SpecOutcome>,
}

impl DispatchReport {
    /// Whether any bootstrap pass issued `replSetInitiate`.
    #[must_use]
    pub fn initiated(&self) -> bool {
        self.bootstrap
            .iter()
            .any(|outcome| matches!(outcome, BootstrapOutcome::Initiated { .. }))
    }
}

/// A single unit of the application.
///
/// Handles one notification at a time: `dispatch` takes `&mut self`, and a
/// notification together with any signal it raises is processed to
/// completion before the call returns.
pub struct Unit<S, D, R, I, P> {
    channel: CoordinationChannel<D>,
    initiator: I,
    membership: MembershipStore<S, R>,
    pod_spec_sink: P,
    queue: DeferredQueue<S>,
    store: S,
}

impl<S, D, R, I, P> Unit<S, D, R, I, P>
where
    S: Store,
    D: RelationData,
    R: AddressResolver,
    I: ReplicaSetInitiator,
    P: PodSpecSink,
{
    /// Creates a unit from its collaborators.
    pub fn new(
        UnitOptions {
            identity,
            initiator,
            pod_spec_sink,
            relation,
            resolver,
            store,
        }: UnitOptions<S, D, R, I, P>,
    ) -> Self {
        Self {
            channel: CoordinationChannel::new(relation, identity.clone()),
            initiator,
            membership: MembershipStore::new(identity, store.clone(), resolver),
            pod_spec_sink,
            queue: DeferredQueue::new(store.clone()),
            store,
        }
    }

    /// This unit's identity.
    pub fn identity(&self) -> &PeerIdentity {
        self.membership.local()
    }

    /// The unit's membership store.
    pub const fn membership(&self) -> &MembershipStore<S, R> {
        &self.membership
    }

    /// The unit's view of the peer relation.
    pub const fn channel(&self) -> &CoordinationChannel<D> {
        &self.channel
    }

    /// Handle `notification`, first replaying anything deferred earlier.
    ///
    /// Notifications that still cannot proceed stay queued for the next
    /// dispatch. On error the queue is left untouched, so the hook can be
    /// retried as a whole.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state, the relation or the spec sink fail,
    /// or if a non-leader attempts to publish cluster configuration.
    pub async fn dispatch(
        &mut self,
        ctx: &HookContext,
        notification: Notification,
    ) -> Result<DispatchReport, Error> {
        let queued = self.queue.load().await?;
        if !queued.is_empty() {
            debug!("replaying {} deferred notification(s)", queued.len());
        }

        let mut report = DispatchReport::default();
        let mut deferred = Vec::new();

        for next in queued.iter().cloned().chain(std::iter::once(notification)) {
            let outcome = self.handle(ctx, &next, &mut report).await?;

            // Nothing still waiting may bring a departed peer back.
            if let Notification::PeerDeparted(peer) = &next {
                deferred.retain(|waiting: &Notification| waiting.peer() != Some(peer));
            }

            if outcome == Outcome::Deferred && !deferred.contains(&next) {
                info!("deferring {}", next);
                deferred.push(next);
            }
        }

        if deferred != queued {
            self.queue.save(&deferred).await?;
        }

        report.deferred = deferred;

        Ok(report)
    }

    async fn handle(
        &self,
        ctx: &HookContext,
        notification: &Notification,
        report: &mut DispatchReport,
    ) -> Result<Outcome, Error> {
        debug!("handling {}", notification);

        let protocol = MembershipProtocol::new(&self.membership, &self.channel, &ctx.config);

        let outcome = match notification {
            Notification::PeerJoined(peer) => protocol.on_peer_joined(peer).await?,
            Notification::PeerUpdated(peer) => protocol.on_peer_updated(peer).await?,
            Notification::PeerDeparted(peer) => protocol.on_peer_departed(peer).await?,
            Notification::ClusterUpdated => protocol.on_cluster_updated().await?,
            Notification::Start | Notification::Upgrade => {
                report.pod_spec = Some(self.apply_spec(ctx, ApplyMode::Always).await?);
                Outcome::Completed(None)
            }
            Notification::ConfigChanged => {
                report.pod_spec = Some(self.apply_spec(ctx, ApplyMode::IfChanged).await?);
                Outcome::Completed(None)
            }
        };

        if let Outcome::Completed(Some(signal)) = outcome {
            let coordinator =
                BootstrapCoordinator::new(&self.membership, &self.channel, &self.initiator);
            report
                .bootstrap
                .push(coordinator.on_members_changed(ctx, signal).await?);
        }

        Ok(outcome)
    }

    async fn apply_spec(&self, ctx: &HookContext, mode: ApplyMode) -> Result<SpecOutcome, Error> {
        WorkloadManager::new(&self.store, &self.pod_spec_sink)
            .apply(ctx, self.identity().application(), mode)
            .await
    }
}
