use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::Error;

/// Runs a hook tool and returns its standard output.
#[async_trait]
pub trait ToolRunner: Clone + Send + Sync + 'static {
    /// Run `tool` with `args`.
    async fn run(&self, tool: &'static str, args: Vec<String>) -> Result<Vec<u8>, Error>;
}

/// Runs hook tools as subprocesses found on `PATH`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, tool: &'static str, args: Vec<String>) -> Result<Vec<u8>, Error> {
        trace!("running {} {:?}", tool, args);

        let output = Command::new(tool)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::Io("failed to spawn hook tool", e))?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                tool,
            });
        }

        Ok(output.stdout)
    }
}
