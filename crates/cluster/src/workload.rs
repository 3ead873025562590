//! Container spec for the `mongod` workload, published by the leader.

use std::error::Error as StdError;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use mongo_store::Store;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{CharmConfig, Error, HookContext};

const POD_SPEC_KEY: &str = "pod-spec";

/// Marker trait for `PodSpecSink` errors
pub trait PodSpecSinkError: Debug + StdError + Send + Sync + 'static {}

/// Publishes a pod spec to the orchestration layer.
#[async_trait]
pub trait PodSpecSink: Send + Sync + 'static {
    /// The error type for publishing.
    type Error: PodSpecSinkError;

    /// Replace the application's pod spec.
    async fn set_spec(&self, spec: &PodSpec) -> Result<(), Self::Error>;
}

/// Pod spec for the application.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PodSpec {
    /// Containers in the pod. The workload has exactly one.
    pub containers: Vec<ContainerSpec>,
}

/// A single container.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Command line the container runs.
    pub command: Vec<String>,

    /// Image reference.
    pub image: String,

    /// Container name.
    pub name: String,

    /// Exposed ports.
    pub ports: Vec<ContainerPort>,
}

/// An exposed container port.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port number inside the container.
    pub container_port: u16,

    /// Port name.
    pub name: String,

    /// Transport protocol.
    pub protocol: String,
}

impl PodSpec {
    /// Computes the spec for `application` under `config`.
    #[must_use]
    pub fn for_workload(application: &str, config: &CharmConfig) -> Self {
        let mut command = vec![
            "mongod".to_string(),
            "--bind_ip".to_string(),
            "0.0.0.0".to_string(),
            "--port".to_string(),
            config.port.to_string(),
        ];

        if config.replica_set {
            command.extend(["--replSet".to_string(), config.replica_set_name.clone()]);
        }

        Self {
            containers: vec![ContainerSpec {
                command,
                image: config.image.clone(),
                name: application.to_string(),
                ports: vec![ContainerPort {
                    container_port: config.port,
                    name: "mongo".to_string(),
                    protocol: "TCP".to_string(),
                }],
            }],
        }
    }
}

/// When to publish a freshly computed spec.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApplyMode {
    /// Publish even if it matches the last published spec.
    Always,

    /// Publish only if it differs from the last published spec.
    IfChanged,
}

/// Result of a spec application.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SpecOutcome {
    /// Only the leader publishes specs.
    NotLeader,

    /// The spec matches what was last published.
    Unchanged,

    /// The spec was published.
    Applied(PodSpec),
}

/// Computes and publishes the workload spec, remembering what it published.
#[derive(Debug)]
pub struct WorkloadManager<'a, S, P> {
    sink: &'a P,
    store: &'a S,
}

impl<'a, S, P> WorkloadManager<'a, S, P>
where
    S: Store,
    P: PodSpecSink,
{
    /// Binds the manager to a unit's state and spec sink.
    pub const fn new(store: &'a S, sink: &'a P) -> Self {
        Self { sink, store }
    }

    /// Publish the spec for `application` if this unit leads and `mode`
    /// allows it.
    ///
    /// # Errors
    ///
    /// Returns an error if unit state cannot be accessed or the spec cannot
    /// be published.
    pub async fn apply(
        &self,
        ctx: &HookContext,
        application: &str,
        mode: ApplyMode,
    ) -> Result<SpecOutcome, Error> {
        if !ctx.is_leader {
            return Ok(SpecOutcome::NotLeader);
        }

        let spec = PodSpec::for_workload(application, &ctx.config);

        if mode == ApplyMode::IfChanged && self.last_applied().await?.as_ref() == Some(&spec) {
            debug!("pod spec unchanged");
            return Ok(SpecOutcome::Unchanged);
        }

        info!("applying pod spec for {}", application);
        self.sink
            .set_spec(&spec)
            .await
            .map_err(|e| Error::PodSpec(e.to_string()))?;

        let encoded = serde_json::to_vec(&spec).map_err(|e| Error::Encode("pod spec", e))?;
        self.store
            .put(POD_SPEC_KEY, Bytes::from(encoded))
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        Ok(SpecOutcome::Applied(spec))
    }

    async fn last_applied(&self) -> Result<Option<PodSpec>, Error> {
        self.store
            .get(POD_SPEC_KEY)
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(|e| Error::Decode("pod spec", e)))
            .transpose()
    }
}
