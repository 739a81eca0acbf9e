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

//! POSIX shell command rendering and validation.
//!
//! Everything sent to a remote host passes through [`sanitize_command`].
//! Paths are single-quoted; glob characters stay bare so that the *remote*
//! shell expands them.

use thiserror::Error;
use tracing::warn;

use crate::probe::PathKind;

/// Upper bound on the size of a command sent over an exec channel
pub const MAX_COMMAND_LENGTH: usize = 16384;

/// Why a command was refused before dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandRejected {
    #[error("empty command not allowed")]
    Empty,
    #[error("command too long: {len} bytes (max: {max} bytes)")]
    TooLong { len: usize, max: usize },
    #[error("command contains null bytes")]
    NullByte,
}

/// Validate a command before it is sent to a remote shell.
pub fn sanitize_command(command: &str) -> Result<&str, CommandRejected> {
    if command.trim().is_empty() {
        return Err(CommandRejected::Empty);
    }

    if command.len() > MAX_COMMAND_LENGTH {
        return Err(CommandRejected::TooLong {
            len: command.len(),
            max: MAX_COMMAND_LENGTH,
        });
    }

    if command.contains('\0') {
        return Err(CommandRejected::NullByte);
    }

    // Verification commands are read-only; these are allowed but suspicious.
    let suspicious_patterns = [
        ("$(", "command substitution"),
        ("`", "backtick command substitution"),
        (":(){ :|:& };:", "fork bomb"),
        (" rm ", "file removal"),
    ];
    for (pattern, description) in &suspicious_patterns {
        if command.contains(pattern) {
            warn!(
                "Potentially dangerous pattern detected in command: {} ({})",
                pattern, description
            );
        }
    }

    Ok(command)
}

/// Quote `s` as a single POSIX shell word.
pub fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Quote a remote path, keeping a leading `~/` relative to the remote `$HOME`.
pub fn quote_path(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) if rest.is_empty() => "\"$HOME\"/".to_string(),
        Some(rest) => format!("\"$HOME\"/{}", quote(rest)),
        None if path == "~" => "\"$HOME\"".to_string(),
        None => quote(path),
    }
}

/// Whether `path` contains shell glob metacharacters.
pub fn has_glob(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Length in bytes of a bracket expression starting at `s[0] == '['`, if it
/// is a well-formed one made of harmless characters.
fn bracket_len(s: &str) -> Option<usize> {
    let body = &s[1..];
    let body = body.strip_prefix(['!', '^']).unwrap_or(body);
    let offset = s.len() - body.len();
    // A `]` directly after the opening bracket is a literal member.
    let search_from = usize::from(body.starts_with(']'));
    let close = body[search_from..].find(']')? + search_from;
    let members = &body[..close];
    let harmless = members
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ']'));
    (harmless && !members.is_empty()).then_some(offset + close + 1)
}

/// Render a glob pattern for the remote shell: literal runs are quoted,
/// `*`, `?` and bracket expressions stay bare.
pub fn quote_glob(pattern: &str) -> String {
    let (prefix, pattern) = match pattern.strip_prefix("~/") {
        Some(rest) => ("\"$HOME\"/", rest),
        None => ("", pattern),
    };

    let mut rendered = String::from(prefix);
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        let bare_len = match c {
            '*' | '?' => Some(1),
            '[' => bracket_len(rest),
            _ => None,
        };
        match bare_len {
            Some(len) => {
                if !literal.is_empty() {
                    rendered.push_str(&quote(&literal));
                    literal.clear();
                }
                rendered.push_str(&rest[..len]);
                rest = &rest[len..];
            }
            None => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    if !literal.is_empty() {
        rendered.push_str(&quote(&literal));
    }
    rendered
}

/// Render a `test -f` / `test -d` command for `path`.
///
/// Glob paths are expanded remotely; the command exits 0 as soon as one
/// expansion has the requested kind, and non-zero when nothing matches.
pub fn existence_test(kind: PathKind, path: &str) -> String {
    let flag = kind.test_flag();
    if has_glob(path) {
        format!(
            "for p in {}; do test {flag} \"$p\" && exit 0; done; exit 1",
            quote_glob(path)
        )
    } else {
        format!("test {flag} {}", quote_path(path))
    }
}
