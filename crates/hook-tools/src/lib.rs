//! Orchestration-layer access through the hook tools available to a charm
//! while a hook runs.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod runner;

pub use error::Error;
pub use runner::{ProcessRunner, ToolRunner};

use std::net::IpAddr;

use async_trait::async_trait;
use mongo_cluster::{
    CharmConfig, DataBag, HookContext, PeerIdentity, PodSpec, PodSpecSink, RelationData,
};
use mongo_resolver::BindAddressSource;
use serde_json::Value;
use tracing::debug;

/// Hook tools bound to one unit and, optionally, one relation.
#[derive(Clone, Debug)]
pub struct HookTools<T = ProcessRunner> {
    relation_id: Option<String>,
    runner: T,
    unit: PeerIdentity,
}

impl HookTools {
    /// Hook tools run as subprocesses on behalf of `unit`.
    pub const fn new(unit: PeerIdentity, relation_id: Option<String>) -> Self {
        Self::with_runner(unit, relation_id, ProcessRunner)
    }
}

impl<T> HookTools<T>
where
    T: ToolRunner,
{
    /// Hook tools run through `runner` on behalf of `unit`.
    pub const fn with_runner(unit: PeerIdentity, relation_id: Option<String>, runner: T) -> Self {
        Self {
            relation_id,
            runner,
            unit,
        }
    }

    /// The relation id relation reads and writes are scoped to.
    pub fn relation_id(&self) -> Option<&str> {
        self.relation_id.as_deref()
    }

    /// Scope relation reads and writes to `relation_id`.
    #[must_use]
    pub fn for_relation(mut self, relation_id: Option<String>) -> Self {
        self.relation_id = relation_id;
        self
    }

    /// Ids of the established relations named `name`.
    ///
    /// # Errors
    ///
    /// Fails if `relation-ids` fails or prints something other than a list.
    pub async fn relation_ids(&self, name: &str) -> Result<Vec<String>, Error> {
        let output = self
            .runner
            .run(
                "relation-ids",
                vec![name.to_string(), "--format=json".to_string()],
            )
            .await?;

        match parse_json(&output, "relation-ids")? {
            Value::Null => Ok(Vec::new()),
            value => serde_json::from_value(value).map_err(|e| Error::Json("relation-ids", e)),
        }
    }

    /// Whether this unit is the application leader.
    ///
    /// # Errors
    ///
    /// Fails if `is-leader` fails or prints something other than a boolean.
    pub async fn is_leader(&self) -> Result<bool, Error> {
        let output = self
            .runner
            .run("is-leader", vec!["--format=json".to_string()])
            .await?;

        serde_json::from_slice(&output).map_err(|e| Error::Json("is-leader", e))
    }

    /// The application's configuration, with defaults for unset keys.
    ///
    /// # Errors
    ///
    /// Fails if `config-get` fails or its output does not match the config
    /// schema.
    pub async fn config(&self) -> Result<CharmConfig, Error> {
        let output = self
            .runner
            .run("config-get", vec!["--format=json".to_string()])
            .await?;

        match parse_json(&output, "config-get")? {
            Value::Null => Ok(CharmConfig::default()),
            value => serde_json::from_value(value).map_err(|e| Error::Json("config-get", e)),
        }
    }

    /// Leadership and configuration for the running hook.
    ///
    /// # Errors
    ///
    /// Fails if either tool fails.
    pub async fn hook_context(&self) -> Result<HookContext, Error> {
        let is_leader = self.is_leader().await?;
        let config = self.config().await?;

        Ok(HookContext::new(is_leader, config))
    }

    fn relation_args(&self) -> Vec<String> {
        self.relation_id
            .iter()
            .flat_map(|id| ["-r".to_string(), id.clone()])
            .collect()
    }
}

#[async_trait]
impl<T> RelationData for HookTools<T>
where
    T: ToolRunner,
{
    type Error = Error;

    async fn get(&self, bag: &DataBag, key: &str) -> Result<Option<String>, Error> {
        let mut args = self.relation_args();
        args.push("--format=json".to_string());

        let owner = match bag {
            DataBag::Unit(unit) => unit.to_string(),
            DataBag::Application(app) => {
                args.push("--app".to_string());
                app.clone()
            }
        };
        args.push(key.to_string());
        args.push(owner);

        let output = self.runner.run("relation-get", args).await?;

        match parse_json(&output, "relation-get")? {
            Value::String(value) if !value.is_empty() => Ok(Some(value)),
            Value::String(_) | Value::Null => Ok(None),
            other => Ok(Some(other.to_string())),
        }
    }

    async fn set(&self, bag: &DataBag, key: &str, value: &str) -> Result<(), Error> {
        let mut args = self.relation_args();

        match bag {
            DataBag::Unit(unit) if *unit == self.unit => {}
            DataBag::Application(app) if app == self.unit.application() => {
                args.push("--app".to_string());
            }
            _ => {
                return Err(Error::Forbidden {
                    bag: bag.clone(),
                    unit: self.unit.clone(),
                });
            }
        }
        args.push(format!("{key}={value}"));

        self.runner.run("relation-set", args).await?;
        debug!("set {} in {}", key, bag);

        Ok(())
    }
}

#[async_trait]
impl<T> BindAddressSource for HookTools<T>
where
    T: ToolRunner,
{
    type Error = Error;

    async fn bind_address(&self, binding: &str) -> Result<Option<IpAddr>, Error> {
        let output = self
            .runner
            .run(
                "network-get",
                vec![
                    binding.to_string(),
                    "--bind-address".to_string(),
                    "--format=json".to_string(),
                ],
            )
            .await?;

        match parse_json(&output, "network-get")? {
            Value::String(address) if !address.is_empty() => address
                .parse()
                .map(Some)
                .map_err(|_| Error::InvalidAddress(address)),
            Value::String(_) | Value::Null => Ok(None),
            other => Err(Error::InvalidAddress(other.to_string())),
        }
    }
}

#[async_trait]
impl<T> PodSpecSink for HookTools<T>
where
    T: ToolRunner,
{
    type Error = Error;

    async fn set_spec(&self, spec: &PodSpec) -> Result<(), Error> {
        let json = serde_json::to_vec(spec).map_err(|e| Error::Json("pod-spec-set", e))?;

        let file = tempfile::Builder::new()
            .prefix("pod-spec")
            .suffix(".json")
            .tempfile()
            .map_err(|e| Error::Io("failed to create pod spec file", e))?;

        tokio::fs::write(file.path(), json)
            .await
            .map_err(|e| Error::Io("failed to write pod spec file", e))?;

        self.runner
            .run(
                "pod-spec-set",
                vec!["--file".to_string(), file.path().display().to_string()],
            )
            .await?;

        Ok(())
    }
}

/// Empty output reads as `null`.
fn parse_json(output: &[u8], tool: &'static str) -> Result<Value, Error> {
    if output.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(output).map_err(|e| Error::Json(tool, e))
}
