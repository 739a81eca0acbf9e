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

//! Concurrent verification of several hosts.

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::connection::Connector;
use crate::error::SessionFailure;
use crate::executor::CommandExecutor;
use crate::node::HostConfig;
use crate::plan::InstallationPlan;
use crate::report::VerificationReport;
use crate::session::VerificationSession;

/// Default number of hosts verified at the same time.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Result of one host's run.
#[derive(Debug)]
pub struct HostOutcome {
    pub host: HostConfig,
    pub result: Result<VerificationReport, SessionFailure>,
}

impl HostOutcome {
    /// Every probe ran and passed.
    pub fn passed(&self) -> bool {
        self.result.as_ref().is_ok_and(|r| r.all_passed())
    }

    /// The run was cut short by a connection or transport error.
    pub fn is_fatal(&self) -> bool {
        self.result.is_err()
    }

    /// The report, complete or partial.
    pub fn report(&self) -> &VerificationReport {
        match &self.result {
            Ok(report) => report,
            Err(failure) => &failure.report,
        }
    }
}

/// Runs one [`VerificationSession`] per host, at most `max_parallel` at a time.
pub struct ParallelVerifier {
    connector: Arc<dyn Connector>,
    plan: InstallationPlan,
    executor: CommandExecutor,
    max_parallel: usize,
}

impl ParallelVerifier {
    pub fn new(connector: Arc<dyn Connector>, plan: InstallationPlan) -> Self {
        Self {
            connector,
            plan,
            executor: CommandExecutor::default(),
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }

    pub fn with_executor(mut self, executor: CommandExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Verify every host. Outcomes come back in the order of `hosts`.
    ///
    /// Cancelling `cancel` stops every running session and prevents queued
    /// ones from connecting.
    pub async fn verify_all(
        &self,
        hosts: Vec<HostConfig>,
        cancel: CancellationToken,
    ) -> Vec<HostOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        tracing::info!(
            "Verifying {} host(s) with {} check(s), up to {} at a time",
            hosts.len(),
            self.plan.len(),
            self.max_parallel
        );

        let tasks = hosts.into_iter().map(|host| {
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.child_token();
            let session = VerificationSession::from_plan(
                host.clone(),
                Arc::clone(&self.connector),
                &self.plan,
            )
            .with_executor(self.executor.clone());

            async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire() => match permit {
                        Ok(permit) => Some(permit),
                        Err(e) => {
                            tracing::error!("Failed to acquire semaphore: {}", e);
                            None
                        }
                    },
                };

                let result = session.run_until_cancelled(cancel).await;
                HostOutcome { host, result }
            }
        });

        join_all(tasks).await
    }
}
