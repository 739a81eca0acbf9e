// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Single command execution with success classification.
//!
//! A [`CommandExecutor`] turns one command string into a [`CommandResult`].
//! Anything that prevents the command from reporting an exit status is an
//! [`ExecutionError`]; a non-zero exit status is just data.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::connection::RemoteSession;
use crate::error::ExecutionError;
use crate::shell::sanitize_command;

/// Default per-command timeout.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Exit codes a command may return and still count as accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessPolicy {
    accepted: Vec<u32>,
}

impl SuccessPolicy {
    pub fn accepting(codes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            accepted: codes.into_iter().collect(),
        }
    }

    pub fn accepts(&self, exit_code: u32) -> bool {
        self.accepted.contains(&exit_code)
    }
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        Self::accepting([0])
    }
}

/// Per-command options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub success: SuccessPolicy,
    /// Overrides the executor default. `Duration::ZERO` disables the timeout.
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_success(mut self, success: SuccessPolicy) -> Self {
        self.success = success;
        self
    }
}

/// Outcome of one command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub command: String,
    pub exit_code: u32,
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "duration_ms", serialize_with = "crate::report::as_millis")]
    pub duration: Duration,
    /// Whether the exit code satisfied the [`SuccessPolicy`] it ran under
    pub accepted: bool,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.accepted
    }
}

/// Runs commands on a [`RemoteSession`].
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    default_timeout: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandExecutor {
    /// `Duration::ZERO` means commands never time out.
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `command` on `session`.
    ///
    /// On timeout or transport failure the session is marked dead before the
    /// error is returned.
    pub async fn run(
        &self,
        session: &RemoteSession,
        command: &str,
        options: &RunOptions,
    ) -> Result<CommandResult, ExecutionError> {
        let command = sanitize_command(command).map_err(|e| ExecutionError::InvalidCommand {
            reason: e.to_string(),
        })?;
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        tracing::debug!("[{}] $ {}", session.host(), command);
        let started = Instant::now();

        let output = if timeout.is_zero() {
            session.exec(command).await
        } else {
            match tokio::time::timeout(timeout, session.exec(command)).await {
                Ok(output) => output,
                Err(_) => {
                    session.mark_dead();
                    tracing::warn!(
                        "[{}] command timed out after {}s: {}",
                        session.host(),
                        timeout.as_secs(),
                        command
                    );
                    return Err(ExecutionError::Timeout {
                        host: session.host().to_string(),
                        command: command.to_string(),
                        timeout,
                    });
                }
            }
        };

        let output = output.inspect_err(|e| {
            if !matches!(e, ExecutionError::InvalidCommand { .. }) {
                session.mark_dead();
            }
            tracing::warn!("[{}] command failed to run: {}", session.host(), e);
        })?;

        let duration = started.elapsed();
        let accepted = options.success.accepts(output.exit_status);
        tracing::debug!(
            "[{}] exit status {} after {:?} (accepted: {})",
            session.host(),
            output.exit_status,
            duration,
            accepted
        );

        Ok(CommandResult {
            command: command.to_string(),
            exit_code: output.exit_status,
            stdout: output.stdout,
            stderr: output.stderr,
            duration,
            accepted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_policy() {
        let policy = SuccessPolicy::default();
        assert!(policy.accepts(0));
        assert!(!policy.accepts(1));

        let policy = SuccessPolicy::accepting([0, 4]);
        assert!(policy.accepts(4));
        assert!(!policy.accepts(8));
    }

    #[test]
    fn test_run_options_builders() {
        let options = RunOptions::default().with_timeout(Duration::from_secs(5));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.success, SuccessPolicy::default());
        assert_eq!(
            CommandExecutor::default().default_timeout(),
            DEFAULT_COMMAND_TIMEOUT
        );
    }

    #[test]
    fn test_command_result_serializes_millis() {
        let result = CommandResult {
            command: "test -d '/zowe'".to_string(),
            exit_code: 1,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_millis(1500),
            accepted: false,
        };
        assert!(!result.is_success());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["exit_code"], 1);
    }
}
