//! Identities and addresses of cluster members.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a cluster member, taken from the unit name assigned by
/// the orchestration layer (for example `mongo/0`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    /// Creates an identity from a unit name.
    pub fn new(unit_name: impl Into<String>) -> Self {
        Self(unit_name.into())
    }

    /// The application the unit belongs to: everything before the `/`.
    #[must_use]
    pub fn application(&self) -> &str {
        self.0.split_once('/').map_or(&self.0, |(app, _)| app)
    }

    /// The raw unit name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerIdentity {
    fn from(unit_name: &str) -> Self {
        Self::new(unit_name)
    }
}

/// Resolved DNS name at which a member's database process is reachable.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberAddress(String);

impl MemberAddress {
    /// Parses an advertised address. Blank values mean "not advertised" and
    /// yield `None`. A trailing root dot is dropped so PTR answers compare
    /// equal to the names peers advertise.
    #[must_use]
    pub fn parse(advertised: &str) -> Option<Self> {
        let trimmed = advertised.trim().trim_end_matches('.');
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The address as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Formats the address as a `host[:port]` member string, omitting the
    /// port when it is the MongoDB default.
    #[must_use]
    pub fn host(&self, port: u16) -> String {
        if port == crate::DEFAULT_PORT {
            self.0.clone()
        } else {
            format!("{}:{port}", self.0)
        }
    }
}

impl fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_name() {
        assert_eq!(PeerIdentity::new("mongo/3").application(), "mongo");
        assert_eq!(PeerIdentity::new("standalone").application(), "standalone");
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(MemberAddress::parse(""), None);
        assert_eq!(MemberAddress::parse("   "), None);
        assert_eq!(
            MemberAddress::parse("10-1-2-3.mongo-endpoints.db.svc.cluster.local.")
                .unwrap()
                .as_str(),
            "10-1-2-3.mongo-endpoints.db.svc.cluster.local"
        );
    }

    #[test]
    fn test_host_port() {
        let address = MemberAddress::parse("a.mongo-endpoints").unwrap();
        assert_eq!(address.host(27017), "a.mongo-endpoints");
        assert_eq!(address.host(27018), "a.mongo-endpoints:27018");
    }
}
