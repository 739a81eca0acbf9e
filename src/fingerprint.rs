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

//! Installation fingerprint verification.
//!
//! The verification tool compares the installed files against a reference
//! hash list and prints a free-text summary such as:
//!
//! ```text
//! Number of files different =  0
//! Number of files extra     =  0
//! Number of files missing   =  0
//! Verification PASSED
//! ```
//!
//! [`FingerprintReport::parse`] reads that summary fail-closed: anything
//! missing, malformed or contradictory yields `overall_passed == false`.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::connection::RemoteSession;
use crate::error::ExecutionError;
use crate::executor::{CommandExecutor, CommandResult, RunOptions};
use crate::probe::{CommandProbe, Probe, Verdict};
use crate::report::ProbeOutcome;
use crate::shell::quote_path;

pub const SUCCESS_MARKER: &str = "Verification PASSED";
pub const FAILURE_MARKER: &str = "Verification FAILED";

/// Makes the login profile's environment visible to the tool.
pub const DEFAULT_ENV_INIT: &str = "touch ~/.profile && . ~/.profile";

/// Hashing a full installation is slow on busy hosts.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const COUNT_PREFIX: &str = "Number of files";

/// The three counters of the tool's summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountField {
    Different,
    Extra,
    Missing,
}

impl CountField {
    const ALL: [CountField; 3] = [Self::Different, Self::Extra, Self::Missing];

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "different" => Some(Self::Different),
            "extra" => Some(Self::Extra),
            "missing" => Some(Self::Missing),
            _ => None,
        }
    }
}

impl fmt::Display for CountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Different => f.write_str("different"),
            Self::Extra => f.write_str("extra"),
            Self::Missing => f.write_str("missing"),
        }
    }
}

/// Something in the tool output that prevents a trustworthy verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ReportProblem {
    #[error("no 'Number of files {0}' line")]
    MissingCount(CountField),

    #[error("'Number of files {field}' has non-integer value '{value}'")]
    InvalidCount { field: CountField, value: String },

    #[error("'Number of files {field}' reported twice with different values ({first} and {second})")]
    ConflictingCount {
        field: CountField,
        first: u64,
        second: u64,
    },
}

/// Structured reading of the verification tool's output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FingerprintReport {
    pub files_different: Option<u64>,
    pub files_extra: Option<u64>,
    pub files_missing: Option<u64>,
    pub success_marker: bool,
    pub failure_marker: bool,
    pub problems: Vec<ReportProblem>,
}

impl FingerprintReport {
    /// Parse the tool's stdout. Lines may come in any order, surrounded by
    /// unrelated output.
    pub fn parse(stdout: &str) -> Self {
        let mut report = Self::default();

        for line in stdout.lines() {
            if line.contains(FAILURE_MARKER) {
                report.failure_marker = true;
            }
            if line.contains(SUCCESS_MARKER) {
                report.success_marker = true;
            }

            let Some(start) = line.find(COUNT_PREFIX) else {
                continue;
            };
            let Some((label, value)) = line[start + COUNT_PREFIX.len()..].split_once('=') else {
                continue;
            };
            let Some(field) = CountField::from_label(label.trim()) else {
                continue;
            };

            let value = value.trim();
            match parse_count(value) {
                Some(count) => report.record(field, count),
                None => report.problems.push(ReportProblem::InvalidCount {
                    field,
                    value: value.to_string(),
                }),
            }
        }

        for field in CountField::ALL {
            let seen = report.count(field).is_some()
                || report.problems.iter().any(|p| {
                    matches!(p, ReportProblem::InvalidCount { field: f, .. } if *f == field)
                });
            if !seen {
                report.problems.push(ReportProblem::MissingCount(field));
            }
        }

        report
    }

    fn slot(&mut self, field: CountField) -> &mut Option<u64> {
        match field {
            CountField::Different => &mut self.files_different,
            CountField::Extra => &mut self.files_extra,
            CountField::Missing => &mut self.files_missing,
        }
    }

    fn record(&mut self, field: CountField, count: u64) {
        let current = *self.slot(field);
        match current {
            None => *self.slot(field) = Some(count),
            Some(first) if first == count => {}
            Some(first) => {
                let problem = ReportProblem::ConflictingCount {
                    field,
                    first: first.min(count),
                    second: first.max(count),
                };
                if !self.problems.contains(&problem) {
                    self.problems.push(problem);
                }
            }
        }
    }

    pub fn count(&self, field: CountField) -> Option<u64> {
        match field {
            CountField::Different => self.files_different,
            CountField::Extra => self.files_extra,
            CountField::Missing => self.files_missing,
        }
    }

    /// True iff every count parsed as zero, the success marker is present,
    /// no failure marker is present and nothing was malformed.
    pub fn overall_passed(&self) -> bool {
        CountField::ALL.iter().all(|f| self.count(*f) == Some(0))
            && self.success_marker
            && !self.failure_marker
            && self.problems.is_empty()
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let show = |count: Option<u64>| count.map_or_else(|| "?".to_string(), |c| c.to_string());
        let mut summary = format!(
            "different={} extra={} missing={}",
            show(self.files_different),
            show(self.files_extra),
            show(self.files_missing)
        );
        if self.failure_marker {
            summary.push_str(", tool reported FAILED");
        } else if self.success_marker {
            summary.push_str(", tool reported PASSED");
        } else {
            summary.push_str(", no verdict line");
        }
        for problem in &self.problems {
            summary.push_str("; ");
            summary.push_str(&problem.to_string());
        }
        summary
    }
}

/// A count is a plain run of ASCII digits; signs and separators are rejected.
fn parse_count(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Decide the fingerprint verdict for a finished tool run.
pub fn classify(result: &CommandResult) -> Verdict {
    let report = FingerprintReport::parse(&result.stdout);

    if result.exit_code != 0 {
        return Verdict::fail(format!(
            "verification tool exited with status {}; {}\n{}",
            result.exit_code,
            report.summary(),
            raw_output(result)
        ));
    }

    if report.overall_passed() {
        Verdict::pass().with_detail(report.summary())
    } else {
        Verdict::fail(format!("{}\n{}", report.summary(), raw_output(result)))
    }
}

fn raw_output(result: &CommandResult) -> String {
    let mut raw = format!("--- verification output ---\n{}", result.stdout);
    if !result.stderr.trim().is_empty() {
        raw.push_str("\n--- stderr ---\n");
        raw.push_str(&result.stderr);
    }
    raw
}

/// Runs the verification tool in a freshly initialised login environment.
#[derive(Debug, Clone)]
pub struct FingerprintVerifier {
    name: String,
    tool_path: String,
    env_init: String,
    timeout: Duration,
}

impl FingerprintVerifier {
    pub fn new(tool_path: impl Into<String>) -> Self {
        Self {
            name: "installation fingerprint matches".to_string(),
            tool_path: tool_path.into(),
            env_init: DEFAULT_ENV_INIT.to_string(),
            timeout: DEFAULT_VERIFY_TIMEOUT,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Shell snippet run before the tool in the same command. Empty disables it.
    pub fn with_env_init(mut self, env_init: impl Into<String>) -> Self {
        self.env_init = env_init.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The single command string sent to the remote shell.
    pub fn command(&self) -> String {
        let tool = quote_path(&self.tool_path);
        if self.env_init.trim().is_empty() {
            tool
        } else {
            format!("{} && {}", self.env_init, tool)
        }
    }

    fn probe(&self) -> CommandProbe {
        CommandProbe::new(&self.name, self.command(), classify)
            .with_options(RunOptions::default().with_timeout(self.timeout))
    }
}

#[async_trait]
impl Probe for FingerprintVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        executor: &CommandExecutor,
        session: &RemoteSession,
    ) -> Result<ProbeOutcome, ExecutionError> {
        let outcome = self.probe().run(executor, session).await?;
        tracing::info!(
            "[{}] fingerprint verification {}",
            session.host(),
            if outcome.passed { "passed" } else { "failed" }
        );
        Ok(outcome)
    }
}
