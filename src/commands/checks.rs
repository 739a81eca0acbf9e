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

use owo_colors::OwoColorize;

use crate::node::HostTarget;
use crate::plan::{Check, InstallationPlan};

/// Print the hosts and the exact command of every check, in run order.
pub fn list_checks(hosts: &[HostTarget], plan: &InstallationPlan) {
    println!("{} {}", "▶".cyan(), "Target hosts".bold());
    for host in hosts {
        println!("  {} {}", "●".cyan(), host.to_string().bold());
    }

    println!("\n{} {}", "▶".cyan(), "Checks".bold());
    let probes = plan.probes();
    for (index, (check, probe)) in plan.checks().iter().zip(&probes).enumerate() {
        println!("  {:>2}. {}", index + 1, probe.name());
        println!("      {} {}", "$".dimmed(), Check::command(check).dimmed());
    }
}
