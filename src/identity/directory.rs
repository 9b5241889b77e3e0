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

//! Active Directory lookups.
//!
//! Both helpers here are routinely unavailable (RSAT missing, machine not
//! joined, no network to a DC) and degrade to "nothing" / `false`.

use crate::core::constants::commands::{POWERSHELL, SYSTEMINFO};
use crate::core::models::{IdentityResult, IdentitySource};
use crate::identity::command::{first_line, powershell_args, CommandRunner};
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Canonical `sAMAccountName` of the caller's own account via `Get-ADUser`.
pub struct DirectoryServiceProvider {
    runner: Arc<dyn CommandRunner>,
    account: Option<String>,
    timeout: Duration,
}

impl DirectoryServiceProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, account: Option<String>, timeout: Duration) -> Self {
        Self {
            runner,
            account,
            timeout,
        }
    }

    fn script(account: &str) -> String {
        format!(
            "Import-Module ActiveDirectory -ErrorAction Stop; \
             (Get-ADUser -Identity '{}' -ErrorAction Stop).sAMAccountName",
            escape_single_quoted(account)
        )
    }
}

/// Escape for a PowerShell single-quoted literal.
fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl IdentityProvider for DirectoryServiceProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::DirectoryService
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        let Some(account) = self.account.as_deref() else {
            debug!("no account name to look up in the directory");
            return None;
        };

        let args = powershell_args(&Self::script(account));
        match self.runner.run(POWERSHELL, &args, self.timeout).await {
            Ok(output) => first_line(&output)
                .and_then(|line| IdentityResult::from_account(line, IdentitySource::DirectoryService)),
            Err(e) => {
                debug!(error = %e, account, "directory lookup failed");
                None
            }
        }
    }
}

/// Reports whether the machine is joined to a domain, via `systeminfo`.
pub struct DomainProbe {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl DomainProbe {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Never fails; any tool problem reads as "not joined".
    pub async fn is_domain_joined(&self) -> bool {
        match self.runner.run(SYSTEMINFO, &[], self.timeout).await {
            Ok(output) => parse_systeminfo_domain(&output)
                .is_some_and(|domain| !domain.eq_ignore_ascii_case("WORKGROUP")),
            Err(e) => {
                debug!(error = %e, "systeminfo failed; assuming not domain-joined");
                false
            }
        }
    }
}

/// Value of the `Domain:` line of `systeminfo` output, if non-empty.
pub fn parse_systeminfo_domain(output: &str) -> Option<&str> {
    output
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("Domain:"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
