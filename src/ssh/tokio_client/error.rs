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

use std::io;
use thiserror::Error;

/// Low-level errors of the russh based client.
///
/// These are mapped onto [`crate::ConnectionError`] and
/// [`crate::ExecutionError`] by the transport layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Keyfile auth failed")]
    KeyAuthFailed,
    #[error("Unable to load key, bad format or passphrase: {0}")]
    KeyInvalid(russh::keys::Error),
    #[error("Wrong password")]
    PasswordWrong,
    #[error("Invalid address was provided: {0}")]
    AddressInvalid(io::Error),
    #[error("The executed command didn't send an exit code")]
    CommandDidntExit,
    #[error("Server check failed")]
    ServerCheckFailed,
    #[error("Failed to connect to SSH agent")]
    AgentConnectionFailed,
    #[error("Failed to request identities from SSH agent")]
    AgentRequestIdentitiesFailed,
    #[error("SSH agent has no identities")]
    AgentNoIdentities,
    #[error("All SSH agent identities were rejected")]
    AgentAuthenticationFailed,
    #[error("Agent authentication is not supported on this platform")]
    AgentUnsupported,
    #[error("Ssh error occured: {0}")]
    SshError(#[from] russh::Error),
}

impl Error {
    /// Whether the server refused the offered credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::KeyAuthFailed
                | Self::KeyInvalid(_)
                | Self::PasswordWrong
                | Self::AgentConnectionFailed
                | Self::AgentRequestIdentitiesFailed
                | Self::AgentNoIdentities
                | Self::AgentAuthenticationFailed
                | Self::AgentUnsupported
        )
    }
}
