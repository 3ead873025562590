//! One-time replica set initiation by the leader.

use std::error::Error as StdError;
use std::fmt::Debug;

use async_trait::async_trait;
use mongo_store::Store;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::relation::RelationData;
use crate::{
    AddressResolver, ClusterInfo, CoordinationChannel, Error, HookContext, MemberAddress,
    MembersChanged, MembershipSet, MembershipStore,
};

/// Marker trait for `ReplicaSetInitiator` errors
pub trait InitiatorError: Debug + StdError + Send + Sync + 'static {}

/// Issues `replSetInitiate` against a running member.
#[async_trait]
pub trait ReplicaSetInitiator: Send + Sync + 'static {
    /// The error type for initiation attempts.
    type Error: InitiatorError;

    /// Initiate the replica set described by `config` through the member at
    /// `target`.
    async fn initiate(&self, target: &MemberAddress, config: &ReplSetConfig)
    -> Result<(), Self::Error>;
}

/// Document passed to `replSetInitiate`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReplSetConfig {
    /// Replica set name.
    #[serde(rename = "_id")]
    pub id: String,

    /// Members with their indices.
    pub members: Vec<ReplSetMember>,
}

/// One entry of [`ReplSetConfig::members`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReplSetMember {
    /// Member index.
    #[serde(rename = "_id")]
    pub id: u32,

    /// `host[:port]` of the member.
    pub host: String,
}

impl ReplSetConfig {
    /// Builds the config from a membership set. Indices follow the set's
    /// iteration order, starting at zero.
    #[must_use]
    pub fn from_members(name: &str, members: &MembershipSet, port: u16) -> Self {
        let members = (0..)
            .zip(members.iter())
            .map(|(id, (_, address))| ReplSetMember {
                id,
                host: address.host(port),
            })
            .collect();

        Self {
            id: name.to_string(),
            members,
        }
    }
}

/// Result of one bootstrap pass.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BootstrapOutcome {
    /// This unit is not the leader.
    NotLeader,

    /// Replica set initiation is switched off.
    Disabled,

    /// The replica set was configured before this pass.
    AlreadyConfigured,

    /// This unit's own address is not resolvable yet, so there is no target
    /// for the call. Nothing was published; the next signal retries.
    TargetUnresolved,

    /// `replSetInitiate` was issued and the configured flag published.
    Initiated {
        /// The config that was sent.
        config: ReplSetConfig,

        /// Whether the call itself reported success.
        succeeded: bool,
    },
}

/// Reacts to [`MembersChanged`] on the leader by initiating the replica set
/// once.
#[derive(Debug)]
pub struct BootstrapCoordinator<'a, S, R, D, I> {
    channel: &'a CoordinationChannel<D>,
    initiator: &'a I,
    store: &'a MembershipStore<S, R>,
}

impl<'a, S, R, D, I> BootstrapCoordinator<'a, S, R, D, I>
where
    S: Store,
    R: AddressResolver,
    D: RelationData,
    I: ReplicaSetInitiator,
{
    /// Binds the coordinator to a unit's state.
    pub const fn new(
        store: &'a MembershipStore<S, R>,
        channel: &'a CoordinationChannel<D>,
        initiator: &'a I,
    ) -> Self {
        Self {
            channel,
            initiator,
            store,
        }
    }

    /// Run one bootstrap pass.
    ///
    /// A failed `replSetInitiate` is logged and otherwise ignored: the flag
    /// is published either way, so the call is never repeated.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state or the relation cannot be accessed.
    pub async fn on_members_changed(
        &self,
        ctx: &HookContext,
        _signal: MembersChanged,
    ) -> Result<BootstrapOutcome, Error> {
        if !ctx.is_leader {
            return Ok(BootstrapOutcome::NotLeader);
        }

        if !ctx.config.replica_set {
            debug!("replica set disabled, skipping bootstrap");
            return Ok(BootstrapOutcome::Disabled);
        }

        if self.is_configured().await? {
            debug!("replica set already configured");
            return Ok(BootstrapOutcome::AlreadyConfigured);
        }

        // Resolving the target caches it, so the member list below includes it.
        let local = self.store.local().clone();
        let Some(target) = self.store.fqdn_for(&local).await? else {
            warn!("own address unresolved, postponing replica set initiation");
            return Ok(BootstrapOutcome::TargetUnresolved);
        };

        let members = self.store.members().await?;
        let config =
            ReplSetConfig::from_members(&ctx.config.replica_set_name, &members, ctx.config.port);

        info!(
            "initiating replica set {} via {} with {} member(s)",
            config.id,
            target,
            config.members.len()
        );

        let succeeded = match self.initiator.initiate(&target, &config).await {
            Ok(()) => true,
            Err(e) => {
                warn!("replSetInitiate via {} failed: {}", target, e);
                false
            }
        };

        self.channel
            .cluster_writer(ctx)?
            .publish_info(&ClusterInfo {
                repl_set_configured: true,
            })
            .await?;
        self.store.mark_configured().await?;

        Ok(BootstrapOutcome::Initiated { config, succeeded })
    }

    async fn is_configured(&self) -> Result<bool, Error> {
        if self.store.is_configured().await? {
            return Ok(true);
        }

        if self.channel.cluster_info().await?.repl_set_configured {
            self.store.mark_configured().await?;
            return Ok(true);
        }

        Ok(false)
    }
}
