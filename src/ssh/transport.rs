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

//! russh-backed implementation of the [`Connector`] and [`RemoteShell`] seams.

use async_trait::async_trait;

use super::known_hosts::get_check_method;
use super::tokio_client::{self, AuthMethod, Client};
use crate::connection::{Connector, RemoteShell, ShellOutput};
use crate::error::{ConnectionError, ExecutionError};
use crate::node::HostConfig;

/// Opens SSH sessions with the credential and host key policy of each
/// [`HostConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

impl SshConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, host: &HostConfig) -> Result<Box<dyn RemoteShell>, ConnectionError> {
        let auth_method = AuthMethod::from(&host.credential);
        let check_method = get_check_method(host.strict_mode);

        let client = Client::connect(
            (host.host.as_str(), host.port),
            &host.username,
            auth_method,
            check_method,
        )
        .await
        .map_err(|e| connection_error(host, e))?;

        tracing::debug!(
            "Authenticated as {} on {}",
            client.get_connection_username(),
            client.get_connection_address()
        );

        Ok(Box::new(SshShell {
            host: host.host.clone(),
            client,
        }))
    }
}

fn connection_error(host: &HostConfig, e: tokio_client::Error) -> ConnectionError {
    let name = host.host.clone();
    match e {
        tokio_client::Error::AddressInvalid(io_err) => ConnectionError::Unreachable {
            host: name,
            reason: io_err.to_string(),
        },
        tokio_client::Error::ServerCheckFailed
        | tokio_client::Error::SshError(russh::Error::UnknownKey) => {
            ConnectionError::HostKeyRejected { host: name }
        }
        tokio_client::Error::SshError(russh::Error::IO(io_err)) => ConnectionError::Unreachable {
            host: name,
            reason: io_err.to_string(),
        },
        e if e.is_auth_failure() => ConnectionError::AuthenticationFailed {
            host: name,
            user: host.username.clone(),
            reason: e.to_string(),
        },
        e => ConnectionError::Transport {
            host: name,
            reason: e.to_string(),
        },
    }
}

/// An authenticated SSH connection; each command gets its own exec channel.
#[derive(Debug)]
pub struct SshShell {
    host: String,
    client: Client,
}

#[async_trait]
impl RemoteShell for SshShell {
    async fn exec(&self, command: &str) -> Result<ShellOutput, ExecutionError> {
        let result = self.client.execute(command).await.map_err(|e| match e {
            tokio_client::Error::CommandDidntExit => ExecutionError::ChannelClosed {
                host: self.host.clone(),
                command: command.to_string(),
            },
            tokio_client::Error::SshError(russh::Error::ChannelOpenFailure(reason)) => {
                ExecutionError::ChannelOpen {
                    host: self.host.clone(),
                    reason: format!("{reason:?}"),
                }
            }
            e => ExecutionError::Transport {
                host: self.host.clone(),
                reason: e.to_string(),
            },
        })?;

        Ok(ShellOutput {
            exit_status: result.exit_status,
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }

    async fn close(&self) -> Result<(), ExecutionError> {
        if self.client.is_closed() {
            return Ok(());
        }
        self.client
            .disconnect()
            .await
            .map_err(|e| ExecutionError::Transport {
                host: self.host.clone(),
                reason: e.to_string(),
            })
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }
}
