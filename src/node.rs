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

use anyhow::{bail, Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroizing;

use crate::ssh::known_hosts::StrictHostKeyChecking;

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default limit for establishing a session, handshake and auth included
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Already-resolved credentials for one host.
///
/// Secrets are held in [`Zeroizing`] buffers and never printed.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(Zeroizing<String>),
    KeyFile {
        path: PathBuf,
        passphrase: Option<Zeroizing<String>>,
    },
    Agent,
}

impl Credential {
    pub fn password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn key_file(path: impl Into<PathBuf>, passphrase: Option<&str>) -> Self {
        Self::KeyFile {
            path: path.into(),
            passphrase: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    /// Short, secret-free description used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::KeyFile { .. } => "key file",
            Self::Agent => "ssh-agent",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::KeyFile { path, passphrase } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Agent => f.write_str("Agent"),
        }
    }
}

/// Where to connect and as whom, before any credential is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
}

impl HostTarget {
    /// Parse `[user@]host[:port]`, falling back to `default_user` when the
    /// spec carries no user part.
    pub fn parse(spec: &str, default_user: Option<&str>) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            bail!("Empty host specification");
        }

        let (user_part, host_part) = match spec.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, spec),
        };

        let (host, port) = match host_part.rsplit_once(':') {
            Some((host, port_str)) if !host.contains(':') => {
                let port = port_str
                    .parse::<u16>()
                    .with_context(|| format!("Invalid port number in '{spec}'"))?;
                (host, port)
            }
            _ => (host_part, DEFAULT_SSH_PORT),
        };

        if host.is_empty() {
            bail!("Missing hostname in '{spec}'");
        }

        let username = match user_part.or(default_user) {
            Some(user) if !user.is_empty() => user.to_string(),
            _ => bail!("No username given for '{spec}' and no default user configured"),
        };

        Ok(Self {
            host: host.to_string(),
            port,
            username,
        })
    }

    pub fn with_credential(self, credential: Credential) -> HostConfig {
        HostConfig::new(self.host, self.port, self.username, credential)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Everything needed to open a session to one target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
    pub strict_mode: StrictHostKeyChecking,
    pub connect_timeout: Duration,
}

impl HostConfig {
    pub fn new(host: String, port: u16, username: String, credential: Credential) -> Self {
        Self {
            host,
            port,
            username,
            credential,
            strict_mode: StrictHostKeyChecking::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_strict_mode(mut self, strict_mode: StrictHostKeyChecking) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl fmt::Display for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}
