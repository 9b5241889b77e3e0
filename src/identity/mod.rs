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

//! Identity sources and the prioritized resolver.
//!
//! Every source implements [`IdentityProvider`]. Sources that shell out go
//! through a [`CommandRunner`] so tests can script tool output instead of
//! invoking real OS commands.

use crate::config::Config;
use crate::core::constants::identity::SYSTEM_ACCOUNTS;
use crate::core::models::{IdentityResult, IdentitySource};
use async_trait::async_trait;
use std::sync::Arc;

pub mod command;
pub mod console;
pub mod directory;
pub mod environment;
pub mod process_owner;
pub mod resolver;
pub mod whoami;

pub use command::{CommandRunner, SystemCommandRunner};
pub use console::ConsoleSessionProvider;
pub use directory::{DirectoryServiceProvider, DomainProbe};
pub use environment::EnvironmentProvider;
pub use process_owner::ProcessOwnerProvider;
pub use resolver::IdentityResolver;
pub use whoami::ShellWhoamiProvider;

/// A single way of finding out who is logged in.
///
/// Implementations swallow their own failures: a missing tool, a timeout or
/// unparseable output all mean "nothing to report".
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Which source this provider represents
    fn source(&self) -> IdentitySource;

    /// Attempt a lookup. `None` means the source had nothing usable.
    async fn try_resolve(&self) -> Option<IdentityResult>;
}

/// True for non-human accounts that must never be reported as the user.
///
/// Matches `SYSTEM`, `LOCAL SERVICE` and `NETWORK SERVICE` case-insensitively,
/// plus machine accounts (trailing `$`).
pub fn is_system_account(username: &str) -> bool {
    let name = username.trim();
    if name.ends_with('$') {
        return true;
    }
    let lowered = name.to_lowercase();
    SYSTEM_ACCOUNTS.iter().any(|account| *account == lowered)
}

/// Production source chain in priority order, all sharing one command runner.
pub fn default_providers(
    config: &Config,
    runner: Arc<dyn CommandRunner>,
) -> Vec<Arc<dyn IdentityProvider>> {
    let environment = EnvironmentProvider::from_process_env();
    let account = environment.account_name();

    vec![
        Arc::new(ConsoleSessionProvider::new(
            runner.clone(),
            config.command_timeout(),
        )),
        Arc::new(ProcessOwnerProvider::new(
            runner.clone(),
            config.powershell_timeout(),
        )),
        Arc::new(DirectoryServiceProvider::new(
            runner.clone(),
            account,
            config.powershell_timeout(),
        )),
        Arc::new(ShellWhoamiProvider::new(runner, config.command_timeout())),
        Arc::new(environment),
    ]
}
