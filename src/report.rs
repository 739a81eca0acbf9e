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

//! Verification results.
//!
//! Outcomes are appended to a [`ReportBuilder`] while probes run. The
//! immutable [`VerificationReport`] only comes into existence once the
//! session has been released, which [`ReportBuilder::finalize`] enforces by
//! taking the [`Released`] receipt.

use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

use crate::connection::Released;
use crate::executor::CommandResult;
use crate::probe::Verdict;

pub(crate) fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Result of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub result: CommandResult,
}

impl ProbeOutcome {
    pub fn new(name: &str, verdict: Verdict, result: CommandResult) -> Self {
        Self {
            name: name.to_string(),
            passed: verdict.passed,
            detail: verdict.detail,
            result,
        }
    }
}

/// Whether every probe of the plan got to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ReportStatus {
    Complete,
    Incomplete { reason: String },
}

/// Final, read-only report of one host's verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    host: String,
    outcomes: Vec<ProbeOutcome>,
    status: ReportStatus,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    duration: Duration,
}

impl VerificationReport {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Outcomes in the order the probes ran.
    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    pub fn status(&self) -> &ReportStatus {
        &self.status
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_complete(&self) -> bool {
        self.status == ReportStatus::Complete
    }

    /// Complete, with every outcome passed.
    pub fn all_passed(&self) -> bool {
        self.is_complete() && self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }
}

/// Accumulates outcomes during a run.
#[derive(Debug)]
pub struct ReportBuilder {
    host: String,
    outcomes: Vec<ProbeOutcome>,
    started: Instant,
}

impl ReportBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            outcomes: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn push(&mut self, outcome: ProbeOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn finalize(self, status: ReportStatus, _released: Released) -> VerificationReport {
        VerificationReport {
            host: self.host,
            outcomes: self.outcomes,
            status,
            duration: self.started.elapsed(),
        }
    }
}
