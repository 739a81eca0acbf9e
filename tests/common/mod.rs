//! In-memory stand-in for an SSH host.
//!
//! The fake shell understands exactly the command shapes instcheck renders:
//! `test -f|-d '<path>'`, the `for p in <glob>; do test ...` loop, and any
//! command registered with [`FakeHost::respond`].

#![allow(dead_code)]

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use instcheck::{
    ConnectionError, Connector, Credential, ExecutionError, HostConfig, RemoteShell, ShellOutput,
};

pub const CLEAN_FINGERPRINT: &str = "\
Info: Verifying installation
Number of files different =  0
Number of files extra     =  0
Number of files missing   =  0
Verification PASSED
";

pub fn host(name: &str) -> HostConfig {
    HostConfig::new(name.to_string(), 22, "zowe".to_string(), Credential::Agent)
}

/// Files, directories and behaviour of one fake host.
#[derive(Default, Clone)]
pub struct FakeHost {
    files: HashSet<String>,
    dirs: HashSet<String>,
    responses: Vec<(String, ShellOutput)>,
    fail_on_command: Option<usize>,
    hang_on_command: Option<usize>,
    command_delay: Option<Duration>,
    refuse: Option<ConnectionError>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.dirs.insert(path.to_string());
        self
    }

    pub fn file(mut self, path: &str) -> Self {
        self.files.insert(path.to_string());
        self
    }

    /// Any command containing `needle` gets this output.
    pub fn respond(mut self, needle: &str, exit_status: u32, stdout: &str) -> Self {
        self.responses.push((
            needle.to_string(),
            ShellOutput {
                exit_status,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        ));
        self
    }

    /// The n-th command (1-based) of a connection fails at transport level.
    pub fn fail_on_command(mut self, n: usize) -> Self {
        self.fail_on_command = Some(n);
        self
    }

    /// The n-th command (1-based) of a connection never completes.
    pub fn hang_on_command(mut self, n: usize) -> Self {
        self.hang_on_command = Some(n);
        self
    }

    pub fn command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = Some(delay);
        self
    }

    pub fn refuse(mut self, error: ConnectionError) -> Self {
        self.refuse = Some(error);
        self
    }

    /// A host with the full standard layout under `/zowe` and `/inst`.
    pub fn standard_install() -> Self {
        Self::new()
            .dir("/zowe")
            .file("/inst/bin/zowe-start.sh")
            .file("/zowe/scripts/internal/opercmd")
            .dir("/zowe/components/jobs-api/bin")
            .file("/zowe/components/jobs-api/bin/jobs-api-server-1.0.5.jar")
            .dir("/zowe/fingerprint")
            .file("/zowe/fingerprint/RefRuntimeHash-1.0.5.txt")
            .respond("zowe-verify-authenticity.sh", 0, CLEAN_FINGERPRINT)
    }

    fn run(&self, command: &str) -> ShellOutput {
        if let Some((_, output)) = self
            .responses
            .iter()
            .find(|(needle, _)| command.contains(needle.as_str()))
        {
            return output.clone();
        }

        if let Some(found) = self.existence(command) {
            return ShellOutput {
                exit_status: if found { 0 } else { 1 },
                ..ShellOutput::default()
            };
        }

        ShellOutput {
            exit_status: 127,
            stdout: String::new(),
            stderr: format!("sh: {command}: not found"),
        }
    }

    fn entries(&self, flag: &str) -> &HashSet<String> {
        if flag == "-d" {
            &self.dirs
        } else {
            &self.files
        }
    }

    fn existence(&self, command: &str) -> Option<bool> {
        if let Some(rest) = command.strip_prefix("test ") {
            let (flag, word) = rest.split_at(2);
            let path = unquote(word.trim_start());
            return Some(self.entries(flag).contains(&path));
        }

        let rest = command.strip_prefix("for p in ")?;
        let (word, tail) = rest.split_once("; do test ")?;
        let flag = &tail[..2];
        let pattern = Pattern::new(&glob_pattern(word)).ok()?;
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        Some(
            self.entries(flag)
                .iter()
                .any(|entry| pattern.matches_with(entry, options)),
        )
    }
}

/// Undo POSIX single quoting of one shell word.
fn unquote(word: &str) -> String {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => in_quotes = !in_quotes,
            '\\' if !in_quotes => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Translate a rendered shell glob word into a `glob::Pattern` string.
fn glob_pattern(word: &str) -> String {
    let mut out = String::new();
    let mut literal = String::new();
    let mut in_quotes = false;
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => in_quotes = !in_quotes,
            '\\' if !in_quotes => {
                if let Some(next) = chars.next() {
                    literal.push(next);
                }
            }
            c if in_quotes => literal.push(c),
            c => {
                out.push_str(&Pattern::escape(&literal));
                literal.clear();
                out.push(c);
            }
        }
    }
    out.push_str(&Pattern::escape(&literal));
    out
}

/// Connection and command bookkeeping shared by every fake session.
#[derive(Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub live: AtomicUsize,
    pub peak_live: AtomicUsize,
    pub closes: AtomicUsize,
    pub commands: Mutex<Vec<(String, String)>>,
}

impl Counters {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    /// Commands sent to `host`, in order.
    pub fn commands_for(&self, host: &str) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

/// A set of fake hosts reachable by name.
#[derive(Default)]
pub struct FakeNetwork {
    hosts: HashMap<String, Arc<FakeHost>>,
    pub counters: Arc<Counters>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: &str, host: FakeHost) -> Arc<Self> {
        Arc::new(Self::new().with_host(name, host))
    }

    pub fn with_host(mut self, name: &str, host: FakeHost) -> Self {
        self.hosts.insert(name.to_string(), Arc::new(host));
        self
    }

    pub fn connector(self: &Arc<Self>) -> Arc<dyn Connector> {
        self.clone()
    }
}

#[async_trait]
impl Connector for FakeNetwork {
    async fn connect(&self, config: &HostConfig) -> Result<Box<dyn RemoteShell>, ConnectionError> {
        let Some(host) = self.hosts.get(&config.host) else {
            return Err(ConnectionError::Unreachable {
                host: config.host.clone(),
                reason: "no route to host".to_string(),
            });
        };
        if let Some(error) = &host.refuse {
            return Err(error.clone());
        }

        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeShell {
            name: config.host.clone(),
            host: host.clone(),
            counters: self.counters.clone(),
            executed: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }))
    }
}

pub struct FakeShell {
    name: String,
    host: Arc<FakeHost>,
    counters: Arc<Counters>,
    executed: AtomicUsize,
    closed: AtomicBool,
}

#[async_trait]
impl RemoteShell for FakeShell {
    async fn exec(&self, command: &str) -> Result<ShellOutput, ExecutionError> {
        let n = self.executed.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .commands
            .lock()
            .unwrap()
            .push((self.name.clone(), command.to_string()));

        if let Some(delay) = self.host.command_delay {
            tokio::time::sleep(delay).await;
        }
        if self.host.hang_on_command == Some(n) {
            std::future::pending::<()>().await;
        }
        if self.host.fail_on_command == Some(n) {
            self.closed.store(true, Ordering::SeqCst);
            return Err(ExecutionError::Transport {
                host: self.name.clone(),
                reason: "connection reset by peer".to_string(),
            });
        }

        Ok(self.host.run(command))
    }

    async fn close(&self) -> Result<(), ExecutionError> {
        self.closed.store(true, Ordering::SeqCst);
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for FakeShell {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}
