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

//! Read-only verification of software installations on remote hosts.
//!
//! A [`VerificationSession`] connects to one host through a [`Connector`],
//! runs an ordered list of [`Probe`]s over a single reused session and
//! returns a [`VerificationReport`]. [`ParallelVerifier`] does the same for
//! many hosts at once.

pub mod cli;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod node;
pub mod plan;
pub mod probe;
pub mod report;
pub mod runner;
pub mod session;
pub mod shell;
pub mod ssh;
pub mod utils;

pub use cli::Cli;
pub use config::Config;
pub use connection::{ConnectionManager, Connector, Released, RemoteSession, RemoteShell, ShellOutput};
pub use error::{ConnectionError, ExecutionError, SessionFailure, VerifyError};
pub use executor::{CommandExecutor, CommandResult, RunOptions, SuccessPolicy};
pub use fingerprint::{FingerprintReport, FingerprintVerifier};
pub use node::{Credential, HostConfig, HostTarget};
pub use plan::{Check, FingerprintCheck, InstallationPlan};
pub use probe::{CommandProbe, ExistenceProbe, PathKind, Probe, Verdict};
pub use report::{ProbeOutcome, ReportBuilder, ReportStatus, VerificationReport};
pub use runner::{HostOutcome, ParallelVerifier};
pub use session::VerificationSession;
pub use ssh::SshConnector;
