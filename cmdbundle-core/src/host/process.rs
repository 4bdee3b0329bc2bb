use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{HostError, HostResult, ProcessOutput, ProcessRunner};
use crate::config::EngineConfig;

/// Runs command lines through `<shell> -c`.
#[derive(Debug, Clone)]
pub struct ShellProcessRunner {
    shell: String,
    timeout: Duration,
}

impl ShellProcessRunner {
    pub fn new(shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.shell.clone(), config.host_command_timeout)
    }
}

#[async_trait]
impl ProcessRunner for ShellProcessRunner {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn run(&self, command_line: &str) -> HostResult<ProcessOutput> {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(HostError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| HostError::Timeout(self.timeout))?
            .map_err(HostError::Spawn)?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        // terminated by a signal
        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, "host process finished");

        Ok(ProcessOutput {
            exit_code,
            output: text,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn runner() -> ShellProcessRunner {
        ShellProcessRunner::new("sh", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let output = runner().run("echo out; echo err 1>&2").await.unwrap();
        assert!(output.success());
        assert_eq!(output.output, "out\nerr\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let output = runner().run("echo nope; exit 3").await.unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.output.trim(), "nope");
    }

    #[tokio::test]
    async fn test_timeout() {
        let runner = ShellProcessRunner::new("sh", Duration::from_millis(50));
        let result = runner.run("sleep 5").await;
        assert!(matches!(result, Err(HostError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_missing_shell() {
        let runner = ShellProcessRunner::new("/nonexistent/shell", Duration::from_secs(1));
        assert!(matches!(runner.run("true").await, Err(HostError::Spawn(_))));
    }
}
