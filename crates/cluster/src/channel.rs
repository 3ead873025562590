//! Typed view over the peer relation.
//!
//! Every unit reads through [`CoordinationChannel`]. Writes go through one of
//! two capabilities: a [`PeerScopedWriter`] that can only touch this unit's own
//! bag, and a [`ClusterScopedWriter`] for the application bag, which is only
//! handed out to the leader.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::relation::{DataBag, RelationData};
use crate::{Error, HookContext, MemberAddress, PeerIdentity};

/// Key in a unit bag holding the unit's advertised address.
pub const FQDN_KEY: &str = "fqdn";

/// Key in the application bag holding the serialized [`ClusterInfo`].
pub const INFO_KEY: &str = "info";

/// Cluster-wide record published by the leader.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    /// Whether the replica set has been initiated.
    #[serde(default)]
    pub repl_set_configured: bool,
}

/// Read access to the relation, plus factories for the write capabilities.
#[derive(Clone, Debug)]
pub struct CoordinationChannel<D> {
    app_bag: DataBag,
    data: D,
    unit: PeerIdentity,
}

impl<D> CoordinationChannel<D>
where
    D: RelationData,
{
    /// Wraps relation data as seen by `unit`.
    pub fn new(data: D, unit: PeerIdentity) -> Self {
        let app_bag = DataBag::Application(unit.application().to_string());

        Self {
            app_bag,
            data,
            unit,
        }
    }

    /// The unit this channel belongs to.
    pub const fn unit(&self) -> &PeerIdentity {
        &self.unit
    }

    /// The address `peer` has advertised, if it has advertised one yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation cannot be read.
    pub async fn peer_address(&self, peer: &PeerIdentity) -> Result<Option<MemberAddress>, Error> {
        let raw = self
            .data
            .get(&DataBag::Unit(peer.clone()), FQDN_KEY)
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;

        Ok(raw.as_deref().and_then(MemberAddress::parse))
    }

    /// The cluster record. Missing or unreadable records count as "nothing
    /// configured yet".
    ///
    /// # Errors
    ///
    /// Returns an error if the relation cannot be read.
    pub async fn cluster_info(&self) -> Result<ClusterInfo, Error> {
        let raw = self
            .data
            .get(&self.app_bag, INFO_KEY)
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;

        let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
            return Ok(ClusterInfo::default());
        };

        match serde_json::from_str(&raw) {
            Ok(info) => Ok(info),
            Err(e) => {
                warn!("ignoring malformed cluster info {:?}: {}", raw, e);
                Ok(ClusterInfo::default())
            }
        }
    }

    /// Write access to this unit's own bag.
    pub const fn peer_writer(&self) -> PeerScopedWriter<'_, D> {
        PeerScopedWriter { channel: self }
    }

    /// Write access to the application bag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonLeaderConfigurationAttempt`] if this unit is not
    /// the leader.
    pub fn cluster_writer(&self, ctx: &HookContext) -> Result<ClusterScopedWriter<'_, D>, Error> {
        if !ctx.is_leader {
            return Err(Error::NonLeaderConfigurationAttempt(self.unit.clone()));
        }

        Ok(ClusterScopedWriter { channel: self })
    }
}

/// Writes this unit's own bag.
#[derive(Debug)]
pub struct PeerScopedWriter<'a, D> {
    channel: &'a CoordinationChannel<D>,
}

impl<D> PeerScopedWriter<'_, D>
where
    D: RelationData,
{
    /// Advertise this unit's address to its peers.
    ///
    /// # Errors
    ///
    /// Returns an error if the relation cannot be written.
    pub async fn publish_address(&self, address: &MemberAddress) -> Result<(), Error> {
        let bag = DataBag::Unit(self.channel.unit.clone());
        debug!("advertising {} in {}", address, bag);

        self.channel
            .data
            .set(&bag, FQDN_KEY, address.as_str())
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }
}

/// Writes the application bag. Obtainable only with leadership.
#[derive(Debug)]
pub struct ClusterScopedWriter<'a, D> {
    channel: &'a CoordinationChannel<D>,
}

impl<D> ClusterScopedWriter<'_, D>
where
    D: RelationData,
{
    /// Publish the cluster record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or the relation
    /// cannot be written.
    pub async fn publish_info(&self, info: &ClusterInfo) -> Result<(), Error> {
        let encoded =
            serde_json::to_string(info).map_err(|e| Error::Encode("cluster info", e))?;
        debug!("publishing cluster info {}", encoded);

        self.channel
            .data
            .set(&self.channel.app_bag, INFO_KEY, &encoded)
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }
}
