use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mongo_cluster::{DataBag, PeerIdentity, RelationData};
use tokio::sync::Mutex;
use tracing::trace;

use crate::Error;

/// A write made through a [`MemoryRelation`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationWrite {
    /// Bag written.
    pub bag: DataBag,

    /// Key written.
    pub key: String,

    /// Value written.
    pub value: String,

    /// Unit that wrote it.
    pub writer: PeerIdentity,
}

#[derive(Debug, Default)]
struct HubState {
    in_flight: Vec<RelationWrite>,
    lagged: bool,
    leader: Option<PeerIdentity>,
    visible: HashMap<(DataBag, String), String>,
    writes: Vec<RelationWrite>,
}

/// Shared relation data for a set of simulated units.
///
/// In lagged mode a write is visible to its writer at once but to other
/// units only after [`MemoryRelationHub::propagate`], mimicking the
/// transport's lack of a propagation bound.
#[derive(Clone, Debug, Default)]
pub struct MemoryRelationHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryRelationHub {
    /// A hub where writes are visible to everyone immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A hub that holds writes back from other units until propagated.
    #[must_use]
    pub fn lagged() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                lagged: true,
                ..HubState::default()
            })),
        }
    }

    /// The relation as seen by `unit`.
    pub fn view(&self, unit: impl Into<PeerIdentity>) -> MemoryRelation {
        MemoryRelation {
            hub: self.clone(),
            unit: unit.into(),
        }
    }

    /// Restrict application bag writes to `leader`, as the orchestration
    /// layer does. `None` lifts the restriction.
    pub async fn set_leader(&self, leader: Option<PeerIdentity>) {
        self.state.lock().await.leader = leader;
    }

    /// Make every in-flight write visible to all units.
    pub async fn propagate(&self) {
        let mut state = self.state.lock().await;
        let in_flight = std::mem::take(&mut state.in_flight);
        for write in in_flight {
            state.visible.insert((write.bag, write.key), write.value);
        }
    }

    /// Every write ever made, in order.
    pub async fn writes(&self) -> Vec<RelationWrite> {
        self.state.lock().await.writes.clone()
    }

    /// Writes made to application bags.
    pub async fn application_writes(&self) -> Vec<RelationWrite> {
        self.writes()
            .await
            .into_iter()
            .filter(|write| matches!(write.bag, DataBag::Application(_)))
            .collect()
    }
}

/// One unit's handle on a [`MemoryRelationHub`].
#[derive(Clone, Debug)]
pub struct MemoryRelation {
    hub: MemoryRelationHub,
    unit: PeerIdentity,
}

impl MemoryRelation {
    fn check_write(&self, bag: &DataBag, leader: Option<&PeerIdentity>) -> Result<(), Error> {
        let allowed = match bag {
            DataBag::Unit(owner) => *owner == self.unit,
            DataBag::Application(app) => {
                app == self.unit.application() && leader.is_none_or(|leader| *leader == self.unit)
            }
        };

        if allowed {
            Ok(())
        } else {
            Err(Error::Forbidden {
                bag: bag.clone(),
                writer: self.unit.clone(),
            })
        }
    }
}

#[async_trait]
impl RelationData for MemoryRelation {
    type Error = Error;

    async fn get(&self, bag: &DataBag, key: &str) -> Result<Option<String>, Self::Error> {
        let state = self.hub.state.lock().await;

        let own_write = state
            .in_flight
            .iter()
            .rev()
            .find(|write| write.writer == self.unit && write.bag == *bag && write.key == key);

        Ok(own_write.map_or_else(
            || state.visible.get(&(bag.clone(), key.to_string())).cloned(),
            |write| Some(write.value.clone()),
        ))
    }

    async fn set(&self, bag: &DataBag, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut state = self.hub.state.lock().await;
        self.check_write(bag, state.leader.as_ref())?;

        trace!("{} writes {}={} into {}", self.unit, key, value, bag);

        let write = RelationWrite {
            bag: bag.clone(),
            key: key.to_string(),
            value: value.to_string(),
            writer: self.unit.clone(),
        };
        state.writes.push(write.clone());

        if state.lagged {
            state.in_flight.push(write);
        } else {
            state
                .visible
                .insert((write.bag, write.key), write.value);
        }

        Ok(())
    }
}
