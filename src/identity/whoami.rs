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

use crate::core::constants::commands::WHOAMI;
use crate::core::models::{IdentityResult, IdentitySource};
use crate::identity::command::{first_line, CommandRunner};
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Owner of the service process as reported by `whoami`.
pub struct ShellWhoamiProvider {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl ShellWhoamiProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }
}

#[async_trait]
impl IdentityProvider for ShellWhoamiProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::ShellWhoami
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        match self.runner.run(WHOAMI, &[], self.timeout).await {
            Ok(output) => first_line(&output)
                .and_then(|line| IdentityResult::from_account(line, IdentitySource::ShellWhoami)),
            Err(e) => {
                debug!(error = %e, "whoami failed");
                None
            }
        }
    }
}
