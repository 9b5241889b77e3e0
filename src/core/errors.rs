// Copyright 2026 BadCompany
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

// Domain error types

use std::time::Duration;
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Invalid or missing configuration (startup only)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    BindError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Serve loop failed or was torn down abnormally
    #[error("Server error: {0}")]
    ServerError(String),
}

/// Failure of an external identity tool.
///
/// These never reach an HTTP caller; identity sources map them to "no result".
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' exited with status {code:?}")]
    NonZeroExit { program: String, code: Option<i32> },

    #[error("'{program}' produced no output")]
    EmptyOutput { program: String },
}
