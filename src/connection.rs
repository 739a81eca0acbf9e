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

//! Remote session lifecycle.
//!
//! A [`ConnectionManager`] owns at most one [`RemoteSession`] per run. The
//! session is created on first [`ConnectionManager::acquire`], shared by every
//! probe of the run, and closed exactly once by
//! [`ConnectionManager::release`].
//!
//! The wire transport sits behind the [`Connector`] and [`RemoteShell`]
//! traits; [`crate::ssh::SshConnector`] is the production implementation.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ConnectionError, ExecutionError};
use crate::node::HostConfig;

/// Raw output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellOutput {
    pub exit_status: u32,
    pub stdout: String,
    pub stderr: String,
}

/// An authenticated connection able to run commands.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run `command` in a fresh shell context and wait for its exit status.
    async fn exec(&self, command: &str) -> Result<ShellOutput, ExecutionError>;

    /// Close the underlying transport.
    async fn close(&self) -> Result<(), ExecutionError>;

    /// Whether the transport has gone away on its own.
    fn is_closed(&self) -> bool;
}

/// Establishes [`RemoteShell`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &HostConfig) -> Result<Box<dyn RemoteShell>, ConnectionError>;
}

/// Proof that a manager's session has been released.
///
/// Only [`ConnectionManager::release`] produces one, and
/// [`crate::report::ReportBuilder::finalize`] requires it.
#[derive(Debug)]
#[must_use]
pub struct Released(());

/// Handle to an authenticated connection to one host.
///
/// Never holds secrets: the credential lives only in [`HostConfig`].
pub struct RemoteSession {
    id: u64,
    host: String,
    port: u16,
    username: String,
    shell: Box<dyn RemoteShell>,
    alive: AtomicBool,
    released: AtomicBool,
    command_lock: Mutex<()>,
}

impl RemoteSession {
    fn new(id: u64, host: &HostConfig, shell: Box<dyn RemoteShell>) -> Self {
        Self {
            id,
            host: host.host.clone(),
            port: host.port,
            username: host.username.clone(),
            shell,
            alive: AtomicBool::new(true),
            released: AtomicBool::new(false),
            command_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire) && !self.shell.is_closed()
    }

    /// Flag the session as unusable. Later commands fail with
    /// [`ExecutionError::SessionClosed`].
    pub fn mark_dead(&self) {
        if self.alive.swap(false, Ordering::AcqRel) {
            tracing::debug!("Session #{} to {} marked dead", self.id, self.host);
        }
    }

    fn serves(&self, host: &HostConfig) -> bool {
        self.host == host.host && self.port == host.port && self.username == host.username
    }

    /// Run one command. Commands on the same session are serialized.
    pub async fn exec(&self, command: &str) -> Result<ShellOutput, ExecutionError> {
        let _guard = self.command_lock.lock().await;
        if !self.is_alive() {
            return Err(ExecutionError::SessionClosed {
                host: self.host.clone(),
            });
        }
        self.shell.exec(command).await
    }

    async fn close(&self) {
        self.mark_dead();
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.shell.close().await {
            Ok(()) => tracing::info!("Released session #{} to {}", self.id, self.host),
            Err(e) => tracing::warn!(
                "Error while closing session #{} to {}: {}",
                self.id,
                self.host,
                e
            ),
        }
    }
}

impl fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("alive", &self.alive.load(Ordering::Relaxed))
            .finish()
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        if !self.released.load(Ordering::Acquire) {
            tracing::warn!(
                "Session #{} to {} dropped without release; closing transport",
                self.id,
                self.host
            );
        }
    }
}

/// Owns the single [`RemoteSession`] of a run.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    session: Option<RemoteSession>,
    next_id: u64,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            session: None,
            next_id: 1,
        }
    }

    /// The live session for `host`, establishing one if needed.
    ///
    /// A dead session, or one for another host, is released first.
    pub async fn acquire(&mut self, host: &HostConfig) -> Result<&RemoteSession, ConnectionError> {
        let reusable = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_alive() && s.serves(host));

        if reusable {
            tracing::debug!("Reusing session to {}", host);
        } else {
            let _ = self.release().await;
            let session = self.establish(host).await?;
            self.session = Some(session);
        }

        self.session
            .as_ref()
            .ok_or_else(|| ConnectionError::Transport {
                host: host.host.clone(),
                reason: "session disappeared after connect".to_string(),
            })
    }

    async fn establish(&mut self, host: &HostConfig) -> Result<RemoteSession, ConnectionError> {
        tracing::info!("Connecting to {} ({} auth)", host, host.credential.kind());

        let shell = match tokio::time::timeout(host.connect_timeout, self.connector.connect(host))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    "Connection to {} timed out after {}s",
                    host,
                    host.connect_timeout.as_secs()
                );
                return Err(ConnectionError::Timeout {
                    host: host.host.clone(),
                    timeout: host.connect_timeout,
                });
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        tracing::info!("Session #{} established to {}", id, host);
        Ok(RemoteSession::new(id, host, shell))
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<&RemoteSession> {
        self.session.as_ref()
    }

    /// Close and forget the current session. Safe to call repeatedly.
    pub async fn release(&mut self) -> Released {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
        Released(())
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("session", &self.session)
            .field("next_id", &self.next_id)
            .finish()
    }
}
