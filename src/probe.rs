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

//! Read-only verification probes.
//!
//! A [`Probe`] runs one or more commands through a [`CommandExecutor`] and
//! folds the result into a [`ProbeOutcome`]. Probes never modify the remote
//! host and never depend on each other.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::connection::RemoteSession;
use crate::error::ExecutionError;
use crate::executor::{CommandExecutor, CommandResult, RunOptions};
use crate::report::ProbeOutcome;
use crate::shell::existence_test;

/// A classifier's judgement on one command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub detail: Option<String>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            detail: None,
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: Some(detail.into()),
        }
    }

    pub fn from_bool(passed: bool) -> Self {
        Self {
            passed,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// One named, independent check against the remote host.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    /// `Err` only for transport level failures.
    async fn run(
        &self,
        executor: &CommandExecutor,
        session: &RemoteSession,
    ) -> Result<ProbeOutcome, ExecutionError>;
}

/// What an [`ExistenceProbe`] expects to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    File,
    Directory,
}

impl PathKind {
    pub fn test_flag(self) -> &'static str {
        match self {
            Self::File => "-f",
            Self::Directory => "-d",
        }
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// Passes iff `path` exists on the remote host as `kind`.
///
/// Glob characters in `path` are expanded by the remote shell; any matching
/// entry of the right kind is enough.
#[derive(Debug, Clone)]
pub struct ExistenceProbe {
    name: String,
    kind: PathKind,
    path: String,
}

impl ExistenceProbe {
    pub fn new(kind: PathKind, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: format!("{kind} {path} exists"),
            kind,
            path,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(PathKind::File, path)
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self::new(PathKind::Directory, path)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    pub fn command(&self) -> String {
        existence_test(self.kind, &self.path)
    }
}

#[async_trait]
impl Probe for ExistenceProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        executor: &CommandExecutor,
        session: &RemoteSession,
    ) -> Result<ProbeOutcome, ExecutionError> {
        let result = executor
            .run(session, &self.command(), &RunOptions::default())
            .await?;
        let verdict = if result.exit_code == 0 {
            Verdict::pass()
        } else {
            Verdict::fail(format!("no {} at {}", self.kind, self.path))
        };
        Ok(ProbeOutcome::new(&self.name, verdict, result))
    }
}

/// Decides pass/fail from a finished command.
pub type Classifier = Arc<dyn Fn(&CommandResult) -> Verdict + Send + Sync>;

/// Runs an arbitrary command and applies a [`Classifier`] to the result.
#[derive(Clone)]
pub struct CommandProbe {
    name: String,
    command: String,
    options: RunOptions,
    classifier: Classifier,
}

impl CommandProbe {
    pub fn new<F>(name: impl Into<String>, command: impl Into<String>, classifier: F) -> Self
    where
        F: Fn(&CommandResult) -> Verdict + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            command: command.into(),
            options: RunOptions::default(),
            classifier: Arc::new(classifier),
        }
    }

    /// A probe that passes when the exit code is accepted by the run options.
    pub fn exit_code(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(name, command, |result| {
            if result.accepted {
                Verdict::pass()
            } else {
                Verdict::fail(format!("exit status {}", result.exit_code))
            }
        })
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }
}

impl fmt::Debug for CommandProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProbe")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Probe for CommandProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        executor: &CommandExecutor,
        session: &RemoteSession,
    ) -> Result<ProbeOutcome, ExecutionError> {
        let result = executor.run(session, &self.command, &self.options).await?;
        let verdict = (self.classifier)(&result);
        Ok(ProbeOutcome::new(&self.name, verdict, result))
    }
}
