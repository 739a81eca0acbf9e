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

//! Error taxonomy for verification runs.
//!
//! Only transport-level problems are errors. A command that ran to completion
//! and reported a non-zero exit status is data (see [`crate::CommandResult`]),
//! and a probe whose checked condition is false is a failed
//! [`crate::ProbeOutcome`], never an `Err`.
//!
//! # Error Categories
//!
//! - [`ConnectionError`]: a session could not be established (fatal)
//! - [`ExecutionError`]: a command could not be dispatched or its channel died (fatal)
//! - [`VerifyError`]: what aborts a [`crate::VerificationSession`]
//! - [`SessionFailure`]: a `VerifyError` together with the partial report

use std::time::Duration;
use thiserror::Error;

use crate::report::VerificationReport;

/// Failure to establish or reuse a remote session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Address resolution failed or no address accepted a TCP connection
    #[error("host {host} is unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// Connect handshake did not finish in time
    #[error("connection to {host} timed out after {}s", .timeout.as_secs())]
    Timeout { host: String, timeout: Duration },

    /// The server rejected every credential we offered
    #[error("authentication failed for {user}@{host}: {reason}")]
    AuthenticationFailed {
        host: String,
        user: String,
        reason: String,
    },

    /// Host key did not match the configured verification policy
    #[error("host key verification failed for {host}")]
    HostKeyRejected { host: String },

    /// Any other protocol level failure during connect
    #[error("SSH transport error while connecting to {host}: {reason}")]
    Transport { host: String, reason: String },
}

/// Failure to run a command on an established session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("session to {host} is closed")]
    SessionClosed { host: String },

    #[error("failed to open a channel on {host}: {reason}")]
    ChannelOpen { host: String, reason: String },

    #[error("channel on {host} closed before `{command}` reported an exit status")]
    ChannelClosed { host: String, command: String },

    #[error("`{command}` did not complete within {}s on {host}", .timeout.as_secs())]
    Timeout {
        host: String,
        command: String,
        timeout: Duration,
    },

    /// Rejected locally, nothing was sent to the remote host
    #[error("command rejected before dispatch: {reason}")]
    InvalidCommand { reason: String },

    #[error("SSH transport error on {host}: {reason}")]
    Transport { host: String, reason: String },
}

/// Reason a verification run stopped before every probe completed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("verification cancelled")]
    Cancelled,
}

/// A fatal error plus whatever was collected before it.
///
/// The report is always marked incomplete.
#[derive(Debug, Error)]
#[error("verification of {} aborted after {} probe(s): {error}", .report.host(), .report.outcomes().len())]
pub struct SessionFailure {
    #[source]
    pub error: VerifyError,
    pub report: VerificationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_messages() {
        let err = ConnectionError::Timeout {
            host: "zos.example.com".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(
            err.to_string(),
            "connection to zos.example.com timed out after 30s"
        );

        let err = ConnectionError::AuthenticationFailed {
            host: "zos.example.com".to_string(),
            user: "ibmuser".to_string(),
            reason: "password rejected".to_string(),
        };
        assert!(err.to_string().contains("ibmuser@zos.example.com"));
    }

    #[test]
    fn test_verify_error_is_transparent() {
        let inner = ExecutionError::SessionClosed {
            host: "h1".to_string(),
        };
        let err: VerifyError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(VerifyError::Cancelled.to_string(), "verification cancelled");
    }
}
