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

//! One host's verification run.
//!
//! A [`VerificationSession`] acquires a single remote session, runs its
//! probes strictly in order and always releases the session before the
//! report is finalized, whatever way the run ends.

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::connection::{ConnectionManager, Connector};
use crate::error::{SessionFailure, VerifyError};
use crate::executor::CommandExecutor;
use crate::node::HostConfig;
use crate::plan::InstallationPlan;
use crate::probe::Probe;
use crate::report::{ReportBuilder, ReportStatus, VerificationReport};

pub struct VerificationSession {
    host: HostConfig,
    manager: ConnectionManager,
    executor: CommandExecutor,
    probes: Vec<Box<dyn Probe>>,
}

impl VerificationSession {
    pub fn new(host: HostConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            host,
            manager: ConnectionManager::new(connector),
            executor: CommandExecutor::default(),
            probes: Vec::new(),
        }
    }

    pub fn from_plan(host: HostConfig, connector: Arc<dyn Connector>, plan: &InstallationPlan) -> Self {
        Self::new(host, connector).with_probes(plan.probes())
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn with_probes(mut self, probes: Vec<Box<dyn Probe>>) -> Self {
        self.probes.extend(probes);
        self
    }

    pub fn with_executor(mut self, executor: CommandExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Run every probe in order.
    pub async fn run(self) -> Result<VerificationReport, SessionFailure> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but stops as soon as `cancel` fires. The
    /// in-flight command is abandoned and the session released.
    pub async fn run_until_cancelled(
        mut self,
        cancel: CancellationToken,
    ) -> Result<VerificationReport, SessionFailure> {
        let mut builder = ReportBuilder::new(&self.host.host);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(VerifyError::Cancelled),
            result = run_probes(
                &mut self.manager,
                &self.host,
                &self.executor,
                &self.probes,
                &mut builder,
            ) => result,
        };

        let released = self.manager.release().await;

        match result {
            Ok(()) => {
                tracing::info!(
                    "[{}] verification finished: {} probe(s) run",
                    self.host.host,
                    builder.len()
                );
                Ok(builder.finalize(ReportStatus::Complete, released))
            }
            Err(error) => {
                tracing::warn!(
                    "[{}] verification aborted after {} of {} probe(s): {}",
                    self.host.host,
                    builder.len(),
                    self.probes.len(),
                    error
                );
                let report = builder.finalize(
                    ReportStatus::Incomplete {
                        reason: error.to_string(),
                    },
                    released,
                );
                Err(SessionFailure { error, report })
            }
        }
    }
}

async fn run_probes(
    manager: &mut ConnectionManager,
    host: &HostConfig,
    executor: &CommandExecutor,
    probes: &[Box<dyn Probe>],
    builder: &mut ReportBuilder,
) -> Result<(), VerifyError> {
    let session = manager.acquire(host).await?;

    for probe in probes {
        tracing::debug!("[{}] running probe: {}", host.host, probe.name());
        let outcome = probe.run(executor, session).await?;
        tracing::info!(
            "[{}] {} {}",
            host.host,
            if outcome.passed { "PASS" } else { "FAIL" },
            outcome.name
        );
        builder.push(outcome);
    }

    Ok(())
}

impl fmt::Debug for VerificationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.probes.iter().map(|p| p.name()).collect();
        f.debug_struct("VerificationSession")
            .field("host", &self.host)
            .field("executor", &self.executor)
            .field("probes", &names)
            .finish()
    }
}
