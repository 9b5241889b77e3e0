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

//! Identity and health data types shared by the resolver and the HTTP layer.

use crate::core::constants::identity::UNKNOWN_USER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which identity source produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    ConsoleSession,
    ProcessOwner,
    DirectoryService,
    ShellWhoami,
    EnvironmentFallback,
}

impl IdentitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::ConsoleSession => "console_session",
            IdentitySource::ProcessOwner => "process_owner",
            IdentitySource::DirectoryService => "directory_service",
            IdentitySource::ShellWhoami => "shell_whoami",
            IdentitySource::EnvironmentFallback => "environment_fallback",
        }
    }
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved identity. Built once per request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResult {
    /// Value exactly as the source reported it (e.g. `CORP\bob`).
    pub raw: String,
    /// Present only when the source reported a `DOMAIN\user` pair.
    pub domain: Option<String>,
    pub username: String,
    pub source: IdentitySource,
    pub session_id: Option<u32>,
}

impl IdentityResult {
    /// Parse `DOMAIN\user` or bare `user` notation, splitting on the first backslash.
    ///
    /// Returns `None` when the username part is empty.
    pub fn from_account(raw: &str, source: IdentitySource) -> Option<Self> {
        let raw = raw.trim();
        let (domain, username) = match raw.split_once('\\') {
            Some((domain, user)) => {
                let domain = domain.trim();
                (
                    (!domain.is_empty()).then(|| domain.to_string()),
                    user.trim(),
                )
            }
            None => (None, raw),
        };

        if username.is_empty() {
            return None;
        }

        Some(Self {
            raw: raw.to_string(),
            domain,
            username: username.to_string(),
            source,
            session_id: None,
        })
    }

    pub fn with_session_id(mut self, session_id: u32) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Sentinel identity used when no source produced a usable user.
    pub fn unknown() -> Self {
        Self {
            raw: UNKNOWN_USER.to_string(),
            domain: None,
            username: UNKNOWN_USER.to_string(),
            source: IdentitySource::EnvironmentFallback,
            session_id: None,
        }
    }
}

/// Address the HTTP listener is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenAddress {
    pub host: String,
    pub port: u16,
}

/// Host and liveness metadata derived at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub host: String,
    pub listen: ListenAddress,
    /// RFC 3339 UTC timestamp.
    pub ts: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_account_splits_on_first_backslash() {
        let id = IdentityResult::from_account("CORP\\bob", IdentitySource::ShellWhoami).unwrap();
        assert_eq!(id.domain.as_deref(), Some("CORP"));
        assert_eq!(id.username, "bob");
        assert_eq!(id.raw, "CORP\\bob");

        let id =
            IdentityResult::from_account("CORP\\ops\\svc", IdentitySource::ShellWhoami).unwrap();
        assert_eq!(id.domain.as_deref(), Some("CORP"));
        assert_eq!(id.username, "ops\\svc");
    }

    #[test]
    fn test_from_account_bare_user_has_no_domain() {
        let id = IdentityResult::from_account("  alice \n", IdentitySource::ShellWhoami).unwrap();
        assert_eq!(id.domain, None);
        assert_eq!(id.username, "alice");
        assert_eq!(id.raw, "alice");
    }

    #[test]
    fn test_from_account_rejects_empty_username() {
        assert!(IdentityResult::from_account("", IdentitySource::ShellWhoami).is_none());
        assert!(IdentityResult::from_account("CORP\\", IdentitySource::ShellWhoami).is_none());
        assert!(IdentityResult::from_account("   ", IdentitySource::ShellWhoami).is_none());
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let json = serde_json::to_string(&IdentitySource::ConsoleSession).unwrap();
        assert_eq!(json, "\"console_session\"");
        assert_eq!(IdentitySource::EnvironmentFallback.to_string(), "environment_fallback");
    }
}
