//! Charm configuration consumed by the cluster core.

use serde::{Deserialize, Serialize};

use crate::MemberAddress;

/// Port `mongod` listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 27017;

/// Operator-supplied configuration, as returned by `config-get`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CharmConfig {
    /// Substring a resolved name must contain before the workload endpoint
    /// counts as ready. Empty disables the check.
    pub endpoint_marker: String,

    /// Container image for the workload.
    pub image: String,

    /// Port `mongod` listens on.
    pub port: u16,

    /// Whether the leader initiates a replica set.
    pub replica_set: bool,

    /// Name of the replica set.
    pub replica_set_name: String,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            endpoint_marker: "-endpoints".to_string(),
            image: "mongo:4.4".to_string(),
            port: DEFAULT_PORT,
            replica_set: true,
            replica_set_name: "rs0".to_string(),
        }
    }
}

impl CharmConfig {
    /// Whether a resolved own address points at a ready workload endpoint.
    #[must_use]
    pub fn endpoint_ready(&self, address: &MemberAddress) -> bool {
        self.endpoint_marker.is_empty() || address.as_str().contains(&self.endpoint_marker)
    }
}
