//! Resolves a unit's advertised address by reverse DNS on the address the
//! orchestration layer bound the workload to.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::error::Error as StdError;
use std::fmt::Debug;
use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::Resolver;
use mongo_cluster::{AddressResolver, MemberAddress};
use tracing::{debug, warn};

/// Source of the address a network binding is bound to.
#[async_trait]
pub trait BindAddressSource: Send + Sync + 'static {
    /// The error type for binding queries.
    type Error: Debug + StdError + Send + Sync;

    /// The bind address of `binding`, if it has one yet.
    async fn bind_address(&self, binding: &str) -> Result<Option<IpAddr>, Self::Error>;
}

/// PTR lookups.
#[async_trait]
pub trait PtrLookup: Send + Sync + 'static {
    /// Names the address reverse-resolves to, in answer order.
    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, Error>;
}

/// PTR lookups through the system resolver configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPtrLookup;

#[async_trait]
impl PtrLookup for SystemPtrLookup {
    async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, Error> {
        let resolver =
            Resolver::tokio_from_system_conf().map_err(|e| Error::ResolverInit(e.to_string()))?;

        let lookup = resolver
            .reverse_lookup(ip)
            .await
            .map_err(|e| Error::Lookup(ip, e.to_string()))?;

        Ok(lookup.iter().map(ToString::to_string).collect())
    }
}

/// Resolves the unit's own address as the PTR name of its binding's bind
/// address. Never falls back to the raw IP: pod IPs are not stable across
/// restarts, the names of ready endpoints are.
#[derive(Clone, Debug)]
pub struct ReverseDnsResolver<B, L = SystemPtrLookup> {
    binding: String,
    lookup: L,
    source: B,
}

impl<B> ReverseDnsResolver<B>
where
    B: BindAddressSource,
{
    /// Resolve through `binding` on `source`, using the system resolver.
    pub fn new(binding: impl Into<String>, source: B) -> Self {
        Self::with_lookup(binding, source, SystemPtrLookup)
    }
}

impl<B, L> ReverseDnsResolver<B, L>
where
    B: BindAddressSource,
    L: PtrLookup,
{
    /// Resolve through `binding` on `source`, using `lookup` for PTR queries.
    pub fn with_lookup(binding: impl Into<String>, source: B, lookup: L) -> Self {
        Self {
            binding: binding.into(),
            lookup,
            source,
        }
    }
}

#[async_trait]
impl<B, L> AddressResolver for ReverseDnsResolver<B, L>
where
    B: BindAddressSource,
    L: PtrLookup,
{
    async fn resolve_own_address(&self) -> Option<MemberAddress> {
        let ip = match self.source.bind_address(&self.binding).await {
            Ok(Some(ip)) => ip,
            Ok(None) => {
                debug!("binding {} has no bind address yet", self.binding);
                return None;
            }
            Err(e) => {
                warn!("failed to query binding {}: {}", self.binding, e);
                return None;
            }
        };

        match self.lookup.reverse(ip).await {
            Ok(names) => {
                let address = names.iter().find_map(|name| MemberAddress::parse(name));
                if address.is_none() {
                    debug!("no PTR record for {}", ip);
                }
                address
            }
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("binding query failed")]
    struct BindingError;

    struct FixedBinding(Result<Option<IpAddr>, ()>);

    #[async_trait]
    impl BindAddressSource for FixedBinding {
        type Error = BindingError;

        async fn bind_address(&self, binding: &str) -> Result<Option<IpAddr>, Self::Error> {
            assert_eq!(binding, "cluster");
            self.0.map_err(|()| BindingError)
        }
    }

    struct FixedLookup(Result<Vec<&'static str>, ()>);

    #[async_trait]
    impl PtrLookup for FixedLookup {
        async fn reverse(&self, ip: IpAddr) -> Result<Vec<String>, Error> {
            self.0
                .clone()
                .map(|names| names.into_iter().map(ToString::to_string).collect())
                .map_err(|()| Error::Lookup(ip, "NXDOMAIN".to_string()))
        }
    }

    fn pod_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 1, 0, 7))
    }

    async fn resolve(
        binding: Result<Option<IpAddr>, ()>,
        lookup: Result<Vec<&'static str>, ()>,
    ) -> Option<String> {
        ReverseDnsResolver::with_lookup("cluster", FixedBinding(binding), FixedLookup(lookup))
            .resolve_own_address()
            .await
            .map(|address| address.to_string())
    }

    #[tokio::test]
    async fn test_resolves_ptr_name() {
        assert_eq!(
            resolve(
                Ok(Some(pod_ip())),
                Ok(vec!["10-1-0-7.mongo-endpoints.db.svc.cluster.local."])
            )
            .await,
            Some("10-1-0-7.mongo-endpoints.db.svc.cluster.local".to_string())
        );
    }

    #[tokio::test]
    async fn test_every_failure_degrades_to_absent() {
        assert_eq!(resolve(Ok(None), Ok(vec!["unused"])).await, None);
        assert_eq!(resolve(Err(()), Ok(vec!["unused"])).await, None);
        assert_eq!(resolve(Ok(Some(pod_ip())), Err(())).await, None);
        assert_eq!(resolve(Ok(Some(pod_ip())), Ok(vec![])).await, None);
    }
}
