//! Remote command transport
//!
//! Uses `tokio::process::Command` to run the `adb` binary and capture its
//! output. The trait seam lets tests script device responses without a
//! device attached.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::DeviceError;

/// Captured result of one external command. `success` reflects the exit
/// status; callers decide whether a failing status is an error.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn trimmed_stdout(&self) -> &str {
        self.stdout.trim()
    }
}

/// Command transport trait
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Run one command to completion and capture its output. `Err` means the
    /// command could not run (spawn failure, deadline); a failing exit status
    /// comes back as `Ok` with `success == false`.
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, DeviceError>;
}

/// Transport backed by the `adb` executable.
pub struct AdbTransport {
    adb_path: String,
    timeout: Duration,
}

impl AdbTransport {
    pub fn new(adb_path: String, timeout: Duration) -> Self {
        Self { adb_path, timeout }
    }
}

#[async_trait]
impl CommandTransport for AdbTransport {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, DeviceError> {
        let mut cmd = Command::new(&self.adb_path);
        // kill_on_drop reaps the child if the caller is cancelled mid-command
        cmd.args(args).kill_on_drop(true);

        let result = tokio::time::timeout(self.timeout, cmd.output()).await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(DeviceError::Transport(format!(
                    "{} failed to spawn: {} (is adb installed?)",
                    self.adb_path, e
                )))
            }
            Err(_) => {
                return Err(DeviceError::Timeout {
                    command: format!("{} {}", self.adb_path, args.join(" ")),
                })
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_stdout() {
        let transport = AdbTransport::new("echo".to_string(), Duration::from_secs(5));
        let output = transport.run(&["hello", "device"]).await.unwrap();
        assert!(output.success);
        assert_eq!(output.trimmed_stdout(), "hello device");
    }

    #[tokio::test]
    async fn test_run_reports_failing_status() {
        let transport = AdbTransport::new("false".to_string(), Duration::from_secs(5));
        let output = transport.run(&[]).await.unwrap();
        assert!(!output.success);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let transport = AdbTransport::new("sleep".to_string(), Duration::from_millis(50));
        let err = transport.run(&["5"]).await.unwrap_err();
        assert!(matches!(err, DeviceError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_run_missing_binary() {
        let transport = AdbTransport::new(
            "definitely-not-a-real-binary-xyz".to_string(),
            Duration::from_secs(1),
        );
        let err = transport.run(&[]).await.unwrap_err();
        assert!(matches!(err, DeviceError::Transport(_)));
    }
}
