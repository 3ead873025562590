use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PeerIdentity;

/// A lifecycle notification delivered by the orchestration layer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "peer", rename_all = "kebab-case")]
pub enum Notification {
    /// A unit joined the peer relation.
    PeerJoined(PeerIdentity),

    /// A unit's bag in the peer relation changed.
    PeerUpdated(PeerIdentity),

    /// A unit left the peer relation.
    PeerDeparted(PeerIdentity),

    /// The application bag of the peer relation changed.
    ClusterUpdated,

    /// The unit started.
    Start,

    /// Configuration changed.
    ConfigChanged,

    /// The charm was upgraded.
    Upgrade,
}

impl Notification {
    /// The peer the notification is about, if any.
    #[must_use]
    pub const fn peer(&self) -> Option<&PeerIdentity> {
        match self {
            Self::PeerJoined(peer) | Self::PeerUpdated(peer) | Self::PeerDeparted(peer) => {
                Some(peer)
            }
            Self::ClusterUpdated | Self::Start | Self::ConfigChanged | Self::Upgrade => None,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerJoined(peer) => write!(f, "peer-joined({peer})"),
            Self::PeerUpdated(peer) => write!(f, "peer-updated({peer})"),
            Self::PeerDeparted(peer) => write!(f, "peer-departed({peer})"),
            Self::ClusterUpdated => f.write_str("cluster-updated"),
            Self::Start => f.write_str("start"),
            Self::ConfigChanged => f.write_str("config-changed"),
            Self::Upgrade => f.write_str("upgrade"),
        }
    }
}
