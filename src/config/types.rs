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

//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::ssh::known_hosts::StrictHostKeyChecking;

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub hosts: Vec<HostEntry>,

    #[serde(default)]
    pub checks: ChecksConfig,
}

/// Global default settings, inherited by every host.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Defaults {
    pub user: Option<String>,
    pub port: Option<u16>,
    #[serde(flatten)]
    pub auth: AuthConfig,
    /// Seconds allowed for the connect handshake
    pub connect_timeout: Option<u64>,
    /// Seconds allowed per command; 0 disables the limit
    pub command_timeout: Option<u64>,
    pub strict_host_key_checking: Option<StrictHostKeyChecking>,
    /// Hosts verified at the same time
    pub parallel: Option<usize>,
}

/// Where a host's credential comes from. Secrets never live in the file.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Name of the environment variable holding the password
    pub password_env: Option<String>,
    pub ssh_key: Option<String>,
    /// Name of the environment variable holding the key passphrase
    pub passphrase_env: Option<String>,
    pub use_agent: Option<bool>,
}

impl AuthConfig {
    pub fn is_empty(&self) -> bool {
        self.password_env.is_none() && self.ssh_key.is_none() && self.use_agent.is_none()
    }
}

/// Host entry format.
///
/// Either `"[user@]hostname[:port]"` or a mapping with per-host overrides.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum HostEntry {
    Simple(String),
    Detailed {
        host: String,
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        port: Option<u16>,
        #[serde(flatten)]
        auth: AuthConfig,
        #[serde(default)]
        strict_host_key_checking: Option<StrictHostKeyChecking>,
    },
}

/// What to verify on every host.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ChecksConfig {
    /// Standard layout checks, run first
    #[serde(default)]
    pub standard: Option<StandardLayout>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub fingerprint: Option<FingerprintConfig>,
}

/// Root and instance directories of a standard installation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StandardLayout {
    pub root_dir: String,
    pub instance_dir: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Path of the verification tool on the remote host
    pub command: String,
    #[serde(default)]
    pub env_init: Option<String>,
    /// Seconds; 0 disables the limit
    #[serde(default)]
    pub timeout: Option<u64>,
}
