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

use super::tokio_client::ServerCheckMethod;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Get the default known_hosts file path
pub fn get_default_known_hosts_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh").join("known_hosts"))
}

/// Create a ServerCheckMethod based on strict host key checking mode
///
/// Verification never writes to the local known_hosts file; hosts that are
/// not yet recorded are only accepted in `accept-new` and `no` modes.
pub fn get_check_method(strict_mode: StrictHostKeyChecking) -> ServerCheckMethod {
    check_method_for(strict_mode, get_default_known_hosts_path())
}

/// Strict mode never degrades to `NoCheck`: without a readable known_hosts
/// file every key is rejected.
fn check_method_for(
    strict_mode: StrictHostKeyChecking,
    known_hosts: Option<PathBuf>,
) -> ServerCheckMethod {
    match strict_mode {
        StrictHostKeyChecking::Yes => match known_hosts {
            Some(path) if path.exists() => {
                tracing::debug!("Using known_hosts file: {:?} (strict mode)", path);
                ServerCheckMethod::KnownHostsFile(path.to_string_lossy().into_owned())
            }
            Some(path) => {
                tracing::warn!(
                    "Known hosts file not found at {:?}; all host keys will be rejected",
                    path
                );
                ServerCheckMethod::RejectAll
            }
            None => {
                tracing::warn!(
                    "Could not determine known_hosts path; all host keys will be rejected"
                );
                ServerCheckMethod::RejectAll
            }
        },
        StrictHostKeyChecking::No => {
            tracing::debug!("Host key checking disabled (strict mode = no)");
            ServerCheckMethod::NoCheck
        }
        StrictHostKeyChecking::AcceptNew => match known_hosts {
            Some(path) if path.exists() => {
                tracing::debug!("Using known_hosts file: {:?} (accept-new mode)", path);
                ServerCheckMethod::AcceptNewKnownHostsFile(path.to_string_lossy().into_owned())
            }
            _ => {
                tracing::debug!("No known_hosts file, accepting host key (accept-new mode)");
                ServerCheckMethod::NoCheck
            }
        },
    }
}

/// Mode for host key checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrictHostKeyChecking {
    /// Always verify host keys (fail on unknown/changed)
    Yes,
    /// Never verify host keys (accept all)
    No,
    /// Verify known hosts, accept hosts that are not recorded yet
    #[default]
    AcceptNew,
}

impl FromStr for StrictHostKeyChecking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "true" => Ok(Self::Yes),
            "no" | "false" => Ok(Self::No),
            "accept-new" | "tofu" => Ok(Self::AcceptNew),
            other => Err(format!(
                "invalid host key checking mode '{other}' (expected yes, no or accept-new)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode_from_str() {
        assert_eq!(
            "yes".parse::<StrictHostKeyChecking>(),
            Ok(StrictHostKeyChecking::Yes)
        );
        assert_eq!(
            "FALSE".parse::<StrictHostKeyChecking>(),
            Ok(StrictHostKeyChecking::No)
        );
        assert_eq!(
            "tofu".parse::<StrictHostKeyChecking>(),
            Ok(StrictHostKeyChecking::AcceptNew)
        );
        assert!("maybe".parse::<StrictHostKeyChecking>().is_err());
    }

    #[test]
    fn test_no_check_when_disabled() {
        assert_eq!(
            get_check_method(StrictHostKeyChecking::No),
            ServerCheckMethod::NoCheck
        );
    }

    #[test]
    fn test_strict_mode_without_known_hosts_rejects_everything() {
        assert_eq!(
            check_method_for(StrictHostKeyChecking::Yes, None),
            ServerCheckMethod::RejectAll
        );

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("known_hosts");
        assert_eq!(
            check_method_for(StrictHostKeyChecking::Yes, Some(missing.clone())),
            ServerCheckMethod::RejectAll
        );

        std::fs::write(&missing, "").unwrap();
        assert_eq!(
            check_method_for(StrictHostKeyChecking::Yes, Some(missing.clone())),
            ServerCheckMethod::KnownHostsFile(missing.to_string_lossy().into_owned())
        );
    }

    #[test]
    fn test_accept_new_without_known_hosts_accepts() {
        assert_eq!(
            check_method_for(StrictHostKeyChecking::AcceptNew, None),
            ServerCheckMethod::NoCheck
        );
    }

    #[test]
    fn test_strict_mode_deserializes_kebab_case() {
        let mode: StrictHostKeyChecking = serde_yaml::from_str("accept-new").unwrap();
        assert_eq!(mode, StrictHostKeyChecking::AcceptNew);
    }
}
