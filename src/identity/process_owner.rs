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

//! Owner of the desktop shell process.
//!
//! Works when the service itself runs as `SYSTEM`: whoever owns `explorer`
//! is the person at the keyboard.

use crate::core::constants::commands::POWERSHELL;
use crate::core::constants::identity::DESKTOP_SHELL_PROCESS;
use crate::core::models::{IdentityResult, IdentitySource};
use crate::identity::command::{powershell_args, CommandRunner};
use crate::identity::{is_system_account, IdentityProvider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ProcessOwnerProvider {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl ProcessOwnerProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    fn script() -> String {
        format!(
            "Get-Process {} -IncludeUserName -ErrorAction SilentlyContinue | \
             Where-Object {{ $_.UserName }} | \
             Select-Object -ExpandProperty UserName",
            DESKTOP_SHELL_PROCESS
        )
    }
}

#[async_trait]
impl IdentityProvider for ProcessOwnerProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::ProcessOwner
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        let args = powershell_args(&Self::script());
        match self.runner.run(POWERSHELL, &args, self.timeout).await {
            Ok(output) => parse_process_owners(&output),
            Err(e) => {
                debug!(error = %e, "desktop shell owner lookup failed");
                None
            }
        }
    }
}

/// First `DOMAIN\user` line that is not a system or machine account.
///
/// One line per running shell instance; several users may be signed in.
pub fn parse_process_owners(output: &str) -> Option<IdentityResult> {
    output
        .lines()
        .filter_map(|line| IdentityResult::from_account(line, IdentitySource::ProcessOwner))
        .find(|id| !is_system_account(&id.username))
}
