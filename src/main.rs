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
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use instcheck::{
    cli::{Cli, Commands},
    commands::{
        checks::list_checks,
        verify::{verify_hosts, VerifyParams, EXIT_FATAL},
    },
    config::Config,
    executor::CommandExecutor,
    runner::DEFAULT_MAX_PARALLEL,
    ssh::{SshConnector, StrictHostKeyChecking},
    utils::init_logging,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = Config::load_from(cli.config.as_deref()).await?;
    let overrides = cli.hosts.clone().unwrap_or_default();
    let plan = config.plan()?;

    match cli.command() {
        Commands::Checks => {
            let targets = config.resolve_targets(&overrides)?;
            list_checks(&targets, &plan);
            Ok(0)
        }
        Commands::Verify => {
            let mut hosts = config.resolve_hosts(&overrides)?;
            if let Some(mode) = &cli.strict_host_key_checking {
                let mode: StrictHostKeyChecking = mode
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid --strict-host-key-checking value")?;
                hosts = hosts
                    .into_iter()
                    .map(|host| host.with_strict_mode(mode))
                    .collect();
            }

            let executor = match cli.timeout {
                Some(secs) => CommandExecutor::new(Duration::from_secs(secs)),
                None => config.executor(),
            };
            let max_parallel = cli
                .parallel
                .or(config.defaults.parallel)
                .unwrap_or(DEFAULT_MAX_PARALLEL);

            verify_hosts(VerifyParams {
                connector: Arc::new(SshConnector::new()),
                hosts,
                plan,
                executor,
                max_parallel,
                json: cli.json,
            })
            .await
        }
    }
}
