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

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "instcheck",
    version,
    about = "Verify a software installation on remote hosts over SSH",
    long_about = "instcheck connects to each target host over SSH and runs read-only checks against an\nexisting installation: directory and file existence (remote globs allowed) and an\nintegrity check through the installation's fingerprint verification tool.\nIt never installs, repairs or modifies anything on the target.",
    after_help = "EXAMPLES:\n  Verify configured hosts:       instcheck --config plan.yaml\n  Verify another host:           instcheck -H ibmuser@zos.example.com:2022\n  Machine readable report:       instcheck --json > report.json\n  Show the commands to be sent:  instcheck checks\n\nExit codes: 0 (every check passed), 1 (a check failed), 2 (fatal error)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(
        long,
        help = "Configuration file path [default: ~/.config/instcheck/config.yaml]"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'H',
        long,
        value_delimiter = ',',
        help = "Comma-separated list of hosts in [user@]hostname[:port] format\nReplaces the hosts of the configuration file"
    )]
    pub hosts: Option<Vec<String>>,

    #[arg(short = 'p', long, help = "Maximum number of hosts verified in parallel")]
    pub parallel: Option<usize>,

    #[arg(
        long,
        help = "Host key checking mode (yes/no/accept-new)\n  yes        - Strict checking against known_hosts\n  no         - Accept all host keys (insecure, testing only)\n  accept-new - Accept unrecorded hosts, reject changed keys"
    )]
    pub strict_host_key_checking: Option<String>,

    #[arg(long, help = "Command timeout in seconds (0 for unlimited)")]
    pub timeout: Option<u64>,

    #[arg(long, help = "Print the reports as JSON on stdout")]
    pub json: bool,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run every configured check on every host (default)")]
    Verify,

    #[command(about = "List the configured checks and the commands they send, without connecting")]
    Checks,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Verify)
    }
}
