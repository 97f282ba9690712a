//! Scripted transport for tests

use std::sync::Mutex;

use async_trait::async_trait;

use crate::device::transport::{CommandOutput, CommandTransport};
use crate::error::DeviceError;

type Handler = Box<dyn FnMut(&str) -> Result<CommandOutput, DeviceError> + Send>;

/// Transport whose responses come from a closure keyed on the full command
/// line (arguments joined with spaces). Records every issued command.
pub struct MockTransport {
    handler: Mutex<Handler>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: FnMut(&str) -> Result<CommandOutput, DeviceError> + Send + 'static,
    {
        Self {
            handler: Mutex::new(Box::new(handler)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command succeeds with the given stdout.
    pub fn ok_all(stdout: &str) -> Self {
        let stdout = stdout.to_string();
        Self::with_handler(move |_| Self::ok(stdout.clone()))
    }

    pub fn ok(stdout: impl Into<String>) -> Result<CommandOutput, DeviceError> {
        Ok(CommandOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        })
    }

    pub fn fail(stderr: impl Into<String>) -> Result<CommandOutput, DeviceError> {
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        })
    }

    /// Commands issued so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandTransport for MockTransport {
    async fn run(&self, args: &[&str]) -> Result<CommandOutput, DeviceError> {
        let cmd = args.join(" ");
        self.calls.lock().unwrap().push(cmd.clone());
        (self.handler.lock().unwrap())(&cmd)
    }
}
