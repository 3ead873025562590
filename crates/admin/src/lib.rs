//! Issues `replSetInitiate` through the `mongosh` shell.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::path::PathBuf;

use async_trait::async_trait;
use mongo_cluster::{DEFAULT_PORT, MemberAddress, ReplSetConfig, ReplicaSetInitiator};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs `rs.initiate(...)` against a member with `mongosh`.
#[derive(Clone, Debug)]
pub struct MongoshInitiator {
    bin: PathBuf,
    port: u16,
}

impl MongoshInitiator {
    /// Creates an initiator using the shell at `bin`, connecting on `port`.
    pub fn new(bin: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            bin: bin.into(),
            port,
        }
    }

    /// Arguments passed to the shell for one initiation.
    ///
    /// # Errors
    ///
    /// Fails if the config cannot be serialized.
    pub fn args(
        &self,
        target: &MemberAddress,
        config: &ReplSetConfig,
    ) -> Result<Vec<String>, Error> {
        let script = format!("rs.initiate({})", serde_json::to_string(config)?);

        Ok(vec![
            "--host".to_string(),
            format!("{}:{}", target, self.port),
            "--quiet".to_string(),
            "--eval".to_string(),
            script,
        ])
    }
}

impl Default for MongoshInitiator {
    fn default() -> Self {
        Self::new("mongosh", DEFAULT_PORT)
    }
}

#[async_trait]
impl ReplicaSetInitiator for MongoshInitiator {
    type Error = Error;

    async fn initiate(&self, target: &MemberAddress, config: &ReplSetConfig) -> Result<(), Error> {
        let args = self.args(target, config)?;
        debug!("running {} {:?}", self.bin.display(), args);

        let output = Command::new(&self.bin)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::Io("failed to run mongosh", e))?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(
            "replica set {} initiated through {}: {}",
            config.id,
            target,
            String::from_utf8_lossy(&output.stdout).trim()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use mongo_cluster::ReplSetMember;

    fn config() -> ReplSetConfig {
        ReplSetConfig {
            id: "rs0".to_string(),
            members: vec![
                ReplSetMember {
                    id: 0,
                    host: "a.mongo-endpoints".to_string(),
                },
                ReplSetMember {
                    id: 1,
                    host: "b.mongo-endpoints".to_string(),
                },
            ],
        }
    }

    fn target() -> MemberAddress {
        MemberAddress::parse("a.mongo-endpoints").unwrap()
    }

    #[test]
    fn test_args() {
        let args = MongoshInitiator::default().args(&target(), &config()).unwrap();

        assert_eq!(
            args,
            vec![
                "--host",
                "a.mongo-endpoints:27017",
                "--quiet",
                "--eval",
                r#"rs.initiate({"_id":"rs0","members":[{"_id":0,"host":"a.mongo-endpoints"},{"_id":1,"host":"b.mongo-endpoints"}]})"#,
            ]
        );
    }

    #[test]
    fn test_args_use_configured_port() {
        let args = MongoshInitiator::new("mongosh", 27018)
            .args(&target(), &config())
            .unwrap();

        assert_eq!(args[1], "a.mongo-endpoints:27018");
    }

    #[tokio::test]
    async fn test_missing_shell_is_io_error() {
        let initiator = MongoshInitiator::new("/nonexistent/mongosh", DEFAULT_PORT);

        let result = initiator.initiate(&target(), &config()).await;

        assert_matches!(result, Err(Error::Io(_, _)));
    }

    #[tokio::test]
    async fn test_failing_shell_is_command_failed() {
        let initiator = MongoshInitiator::new("false", DEFAULT_PORT);

        let result = initiator.initiate(&target(), &config()).await;

        assert_matches!(result, Err(Error::CommandFailed { .. }));
    }
}
