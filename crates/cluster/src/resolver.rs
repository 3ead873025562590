use async_trait::async_trait;

use crate::MemberAddress;

/// Resolves the address this unit advertises to its peers.
///
/// Implementations never fail: any lookup problem yields `None` and the
/// caller simply asks again later.
#[async_trait]
pub trait AddressResolver: Send + Sync + 'static {
    /// Resolve this unit's own reachable address, if the workload endpoint
    /// has one yet.
    async fn resolve_own_address(&self) -> Option<MemberAddress>;
}
