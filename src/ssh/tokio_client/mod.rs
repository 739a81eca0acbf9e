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

//! Asynchronous SSH client on the tokio runtime, powered by russh.
//!
//! The heart of this module is [`Client`]. Use it to connect, authenticate
//! and execute commands; every [`Client::execute`] call runs in a fresh
//! exec channel, so no shell state survives between calls.
//!
//! # Features
//! * Connect to a SSH host by name or IP
//! * Password, private key file and SSH agent authentication
//! * Host key verification against known_hosts
//! * Capture stdout, stderr and the exit status of a command

pub mod authentication;
pub mod channel_manager;
pub mod connection;
pub mod error;

pub use authentication::{AuthMethod, ServerCheckMethod};
pub use channel_manager::CommandExecutedResult;
pub use connection::{Client, ClientHandler};
pub use error::Error;

pub use russh::client::Config;
