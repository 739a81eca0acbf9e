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

//! Ordered list of checks for one installation.

use std::time::Duration;

use crate::fingerprint::FingerprintVerifier;
use crate::probe::{ExistenceProbe, PathKind, Probe};
use crate::shell::existence_test;

/// Fingerprint tool invocation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintCheck {
    pub tool_path: String,
    pub env_init: Option<String>,
    pub timeout: Option<Duration>,
    pub name: Option<String>,
}

impl FingerprintCheck {
    pub fn new(tool_path: impl Into<String>) -> Self {
        Self {
            tool_path: tool_path.into(),
            env_init: None,
            timeout: None,
            name: None,
        }
    }

    fn verifier(&self) -> FingerprintVerifier {
        let mut verifier = FingerprintVerifier::new(&self.tool_path);
        if let Some(env_init) = &self.env_init {
            verifier = verifier.with_env_init(env_init);
        }
        if let Some(timeout) = self.timeout {
            verifier = verifier.with_timeout(timeout);
        }
        if let Some(name) = &self.name {
            verifier = verifier.named(name);
        }
        verifier
    }
}

/// A single planned check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Exists {
        kind: PathKind,
        path: String,
        name: Option<String>,
    },
    Fingerprint(FingerprintCheck),
}

impl Check {
    /// The command text this check sends to the remote shell.
    pub fn command(&self) -> String {
        match self {
            Self::Exists { kind, path, .. } => existence_test(*kind, path),
            Self::Fingerprint(check) => check.verifier().command(),
        }
    }

    pub fn probe(&self) -> Box<dyn Probe> {
        match self {
            Self::Exists { kind, path, name } => {
                let probe = ExistenceProbe::new(*kind, path.clone());
                match name {
                    Some(name) => Box::new(probe.named(name.clone())),
                    None => Box::new(probe),
                }
            }
            Self::Fingerprint(check) => Box::new(check.verifier()),
        }
    }
}

/// Checks in the order they run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationPlan {
    checks: Vec<Check>,
}

impl InstallationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard layout check of a Zowe runtime: root and instance
    /// directories, key scripts, the jobs API jar, the reference hash file,
    /// then the fingerprint comparison.
    pub fn standard(root_dir: &str, instance_dir: &str) -> Self {
        let root = root_dir.trim_end_matches('/');
        let instance = instance_dir.trim_end_matches('/');

        Self::new()
            .directory(root)
            .file(format!("{instance}/bin/zowe-start.sh"))
            .file(format!("{root}/scripts/internal/opercmd"))
            .file(format!("{root}/components/jobs-api/bin/jobs-api-server-*.jar"))
            .directory(format!("{root}/fingerprint"))
            .file(format!("{root}/fingerprint/RefRuntimeHash-*.txt"))
            .fingerprint(FingerprintCheck::new(format!(
                "{root}/bin/zowe-verify-authenticity.sh"
            )))
    }

    pub fn directory(self, path: impl Into<String>) -> Self {
        self.exists(PathKind::Directory, path)
    }

    pub fn file(self, path: impl Into<String>) -> Self {
        self.exists(PathKind::File, path)
    }

    pub fn exists(mut self, kind: PathKind, path: impl Into<String>) -> Self {
        self.checks.push(Check::Exists {
            kind,
            path: path.into(),
            name: None,
        });
        self
    }

    pub fn fingerprint(mut self, check: FingerprintCheck) -> Self {
        self.checks.push(Check::Fingerprint(check));
        self
    }

    pub fn push(&mut self, check: Check) {
        self.checks.push(check);
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Build fresh probes for one session.
    pub fn probes(&self) -> Vec<Box<dyn Probe>> {
        self.checks.iter().map(Check::probe).collect()
    }
}
