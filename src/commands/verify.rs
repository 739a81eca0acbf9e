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

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::connection::Connector;
use crate::executor::CommandExecutor;
use crate::node::HostConfig;
use crate::plan::InstallationPlan;
use crate::report::VerificationReport;
use crate::runner::{HostOutcome, ParallelVerifier};

/// Every host completed and every check passed.
pub const EXIT_PASSED: i32 = 0;
/// At least one check failed.
pub const EXIT_FAILED: i32 = 1;
/// At least one host could not be fully verified.
pub const EXIT_FATAL: i32 = 2;

pub struct VerifyParams {
    pub connector: Arc<dyn Connector>,
    pub hosts: Vec<HostConfig>,
    pub plan: InstallationPlan,
    pub executor: CommandExecutor,
    pub max_parallel: usize,
    pub json: bool,
}

/// Verify every host and print the results. Returns the process exit code.
pub async fn verify_hosts(params: VerifyParams) -> Result<i32> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling verification");
            ctrl_c.cancel();
        }
    });

    let verifier = ParallelVerifier::new(params.connector, params.plan)
        .with_executor(params.executor)
        .with_max_parallel(params.max_parallel);
    let outcomes = verifier.verify_all(params.hosts, cancel).await;

    if params.json {
        print_json(&outcomes)?;
    } else {
        print_summary(&outcomes);
    }

    Ok(exit_code(&outcomes))
}

pub fn exit_code(outcomes: &[HostOutcome]) -> i32 {
    if outcomes.iter().any(HostOutcome::is_fatal) {
        EXIT_FATAL
    } else if outcomes.iter().all(HostOutcome::passed) {
        EXIT_PASSED
    } else {
        EXIT_FAILED
    }
}

#[derive(Serialize)]
struct HostSummary<'a> {
    host: String,
    passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    report: &'a VerificationReport,
}

fn print_json(outcomes: &[HostOutcome]) -> Result<()> {
    let summaries: Vec<HostSummary> = outcomes
        .iter()
        .map(|outcome| HostSummary {
            host: outcome.host.to_string(),
            passed: outcome.passed(),
            error: outcome.result.as_ref().err().map(|f| f.error.to_string()),
            report: outcome.report(),
        })
        .collect();
    let json = serde_json::to_string_pretty(&summaries).context("Failed to serialize reports")?;
    println!("{json}");
    Ok(())
}

/// Format a Duration into a human-readable string
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs_f64();

    if total_seconds < 1.0 {
        format!("{:.1} ms", total_seconds * 1000.0)
    } else if total_seconds < 60.0 {
        format!("{total_seconds:.2} s")
    } else {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    }
}

fn print_summary(outcomes: &[HostOutcome]) {
    println!("\n{} {}\n", "▶".cyan(), "Verification Results".bold());

    for outcome in outcomes {
        let report = outcome.report();
        let passed = report.outcomes().iter().filter(|o| o.passed).count();

        let marker = if outcome.passed() {
            "●".green().to_string()
        } else {
            "●".red().to_string()
        };
        println!(
            "  {} {} - {}/{} check(s) passed in {}",
            marker,
            outcome.host.to_string().bold(),
            passed,
            report.outcomes().len(),
            format_duration(report.duration())
        );

        for probe in report.outcomes() {
            if probe.passed {
                println!("      {} {}", "✓".green(), probe.name);
            } else {
                println!("      {} {}", "✗".red(), probe.name);
                if let Some(detail) = &probe.detail {
                    for line in detail.lines() {
                        println!("          {}", line.dimmed());
                    }
                }
            }
        }

        if let Err(failure) = &outcome.result {
            println!("      {} {}", "aborted:".red().bold(), failure.error);
        }
    }

    let passed = outcomes.iter().filter(|o| o.passed()).count();
    let fatal = outcomes.iter().filter(|o| o.is_fatal()).count();
    let failed = outcomes.len() - passed - fatal;
    println!(
        "\n{} {} passed, {} failed, {} aborted",
        "Summary:".bold(),
        passed.to_string().green(),
        failed.to_string().red(),
        fatal.to_string().yellow()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250.0 ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50 s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
