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

//! Turning configuration into hosts and a check plan.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::CommandExecutor;
use crate::node::{Credential, HostConfig, HostTarget, DEFAULT_SSH_PORT};
use crate::plan::{FingerprintCheck, InstallationPlan};
use crate::ssh::StrictHostKeyChecking;

use super::types::{AuthConfig, Config, HostEntry};
use super::utils::{expand_env_vars, expand_tilde, get_current_username};

/// A host entry resolved up to, but not including, its credential.
struct ResolvedEntry<'a> {
    target: HostTarget,
    auth: Option<&'a AuthConfig>,
    strict: Option<StrictHostKeyChecking>,
}

fn read_secret_env(var: &str, what: &str) -> Result<String> {
    std::env::var(var)
        .with_context(|| format!("Environment variable {var} for the {what} is not set"))
}

impl AuthConfig {
    /// Resolve into a credential; `None` when nothing is configured.
    pub fn resolve(&self) -> Result<Option<Credential>> {
        if let Some(var) = &self.password_env {
            let password = read_secret_env(var, "SSH password")?;
            return Ok(Some(Credential::password(&password)));
        }

        if let Some(key) = &self.ssh_key {
            let path = expand_tilde(&PathBuf::from(expand_env_vars(key)?));
            if !path.exists() {
                bail!("SSH key file {} does not exist", path.display());
            }
            let passphrase = match &self.passphrase_env {
                Some(var) => Some(read_secret_env(var, "key passphrase")?),
                None => None,
            };
            return Ok(Some(Credential::key_file(path, passphrase.as_deref())));
        }

        if self.use_agent == Some(true) {
            return Ok(Some(Credential::Agent));
        }

        Ok(None)
    }
}

impl Config {
    fn default_credential(&self) -> Result<Credential> {
        if let Some(credential) = self.defaults.auth.resolve()? {
            return Ok(credential);
        }
        if std::env::var_os("SSH_AUTH_SOCK").is_some() {
            tracing::debug!("No credential configured, falling back to ssh-agent");
            return Ok(Credential::Agent);
        }
        bail!("No credential configured. Set password_env, ssh_key or use_agent in the defaults or per host")
    }

    fn default_user(&self) -> Result<Option<String>> {
        match &self.defaults.user {
            Some(user) => Ok(Some(expand_env_vars(user)?)),
            None => Ok(get_current_username()),
        }
    }

    fn finish_host(&self, host: HostConfig, strict: Option<StrictHostKeyChecking>) -> HostConfig {
        let mut host = host.with_strict_mode(
            strict
                .or(self.defaults.strict_host_key_checking)
                .unwrap_or_default(),
        );
        if let Some(secs) = self.defaults.connect_timeout {
            host = host.with_connect_timeout(Duration::from_secs(secs));
        }
        host
    }

    /// Resolve a `[user@]host[:port]` string with the configured defaults.
    fn target_from_spec(&self, spec: &str) -> Result<HostTarget> {
        let spec = expand_env_vars(spec)?;
        let default_user = self.default_user()?;
        let mut target = HostTarget::parse(&spec, default_user.as_deref())?;
        if !spec.contains(':') {
            target.port = self.defaults.port.unwrap_or(DEFAULT_SSH_PORT);
        }
        Ok(target)
    }

    /// Every target with its per-host overrides, or `overrides` instead when
    /// non-empty.
    fn targets(&self, overrides: &[String]) -> Result<Vec<ResolvedEntry<'_>>> {
        let targets: Vec<ResolvedEntry<'_>> = if !overrides.is_empty() {
            overrides
                .iter()
                .map(|spec| {
                    Ok(ResolvedEntry {
                        target: self.target_from_spec(spec)?,
                        auth: None,
                        strict: None,
                    })
                })
                .collect::<Result<_>>()?
        } else {
            self.hosts
                .iter()
                .map(|entry| self.entry_target(entry))
                .collect::<Result<_>>()?
        };

        if targets.is_empty() {
            bail!("No hosts configured. Add a 'hosts' section or pass --host");
        }
        Ok(targets)
    }

    fn entry_target<'a>(&self, entry: &'a HostEntry) -> Result<ResolvedEntry<'a>> {
        match entry {
            HostEntry::Simple(spec) => Ok(ResolvedEntry {
                target: self.target_from_spec(spec)?,
                auth: None,
                strict: None,
            }),
            HostEntry::Detailed {
                host,
                user,
                port,
                auth,
                strict_host_key_checking,
            } => {
                let name = expand_env_vars(host)?;
                let username = match user {
                    Some(user) => expand_env_vars(user)?,
                    None => self
                        .default_user()?
                        .with_context(|| format!("No user configured for host {name}"))?,
                };
                Ok(ResolvedEntry {
                    target: HostTarget {
                        host: name,
                        port: port.or(self.defaults.port).unwrap_or(DEFAULT_SSH_PORT),
                        username,
                    },
                    auth: Some(auth),
                    strict: *strict_host_key_checking,
                })
            }
        }
    }

    /// Hosts to connect to, without touching any credential source.
    pub fn resolve_targets(&self, overrides: &[String]) -> Result<Vec<HostTarget>> {
        Ok(self
            .targets(overrides)?
            .into_iter()
            .map(|entry| entry.target)
            .collect())
    }

    /// Hosts ready to connect to, credentials included.
    pub fn resolve_hosts(&self, overrides: &[String]) -> Result<Vec<HostConfig>> {
        self.targets(overrides)?
            .into_iter()
            .map(|entry| {
                let own = match entry.auth {
                    Some(auth) => auth.resolve().with_context(|| {
                        format!("Invalid credential for host {}", entry.target.host)
                    })?,
                    None => None,
                };
                let credential = match own {
                    Some(credential) => credential,
                    None => self.default_credential()?,
                };
                Ok(self.finish_host(entry.target.with_credential(credential), entry.strict))
            })
            .collect()
    }

    /// Build the check plan, expanding environment variables in every path.
    pub fn plan(&self) -> Result<InstallationPlan> {
        let checks = &self.checks;
        let mut plan = match &checks.standard {
            Some(layout) => InstallationPlan::standard(
                &expand_env_vars(&layout.root_dir).context("In checks.standard.root_dir")?,
                &expand_env_vars(&layout.instance_dir)
                    .context("In checks.standard.instance_dir")?,
            ),
            None => InstallationPlan::new(),
        };

        for dir in &checks.directories {
            plan = plan.directory(expand_env_vars(dir).context("In checks.directories")?);
        }
        for file in &checks.files {
            plan = plan.file(expand_env_vars(file).context("In checks.files")?);
        }
        if let Some(fingerprint) = &checks.fingerprint {
            let command = expand_env_vars(&fingerprint.command)
                .context("In checks.fingerprint.command")?;
            let mut check = FingerprintCheck::new(command);
            check.env_init = fingerprint.env_init.clone();
            check.timeout = fingerprint.timeout.map(Duration::from_secs);
            plan = plan.fingerprint(check);
        }

        if plan.is_empty() {
            bail!("No checks configured. Add a 'checks' section to the configuration");
        }
        Ok(plan)
    }

    pub fn executor(&self) -> CommandExecutor {
        match self.defaults.command_timeout {
            Some(secs) => CommandExecutor::new(Duration::from_secs(secs)),
            None => CommandExecutor::default(),
        }
    }
}
