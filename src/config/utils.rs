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

//! Configuration utility functions.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Expand tilde (~) in path to home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if path_str.starts_with("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(path_str.replacen("~", &home, 1));
            }
        }
    }
    path.to_path_buf()
}

fn is_var_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Expand environment variables in a string.
/// Supports ${VAR} and $VAR syntax.
///
/// Unlike shell expansion, an unset variable is an error: a check against a
/// path that still contains `${ZOWE_ROOT_DIR}` can never be meaningful.
/// A `$` that does not start a variable name is kept as-is.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if end > 0 && braced[..end].chars().all(is_var_char) => {
                    (&braced[..end], end + 2)
                }
                Some(_) => bail!("Invalid variable reference in '{input}'"),
                None => bail!("Unterminated '${{' in '{input}'"),
            }
        } else {
            let end = after.find(|c: char| !is_var_char(c)).unwrap_or(after.len());
            (&after[..end], end)
        };

        if name.is_empty() {
            result.push('$');
            rest = after;
            continue;
        }

        match std::env::var(name) {
            Ok(value) => result.push_str(&value),
            Err(_) => bail!("Environment variable {name} is not set (referenced in '{input}')"),
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Get current username from the environment, then from the system.
pub fn get_current_username() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|user| !user.is_empty())
        .or_else(|| {
            whoami::username()
                .inspect_err(|e| tracing::debug!("Could not determine local user: {e}"))
                .ok()
        })
        .filter(|user| !user.is_empty())
}
