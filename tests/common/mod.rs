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

// Common test utilities and helpers for all test modules

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use whoami_service::api::AppState;
use whoami_service::config::Config;
use whoami_service::core::errors::CommandError;
use whoami_service::core::models::{IdentityResult, IdentitySource};
use whoami_service::identity::{
    CommandRunner, DomainProbe, EnvironmentProvider, IdentityProvider, IdentityResolver,
};

pub const SYSTEMINFO_JOINED: &str = "\
Host Name:                 WS-0142
OS Name:                   Microsoft Windows 11 Enterprise
Domain:                    corp.example.com
";

pub const SYSTEMINFO_WORKGROUP: &str = "\
Host Name:                 HOME-PC
Domain:                    WORKGROUP
";

/// Provider that always answers with the same raw account (or nothing)
pub struct MockProvider {
    pub source: IdentitySource,
    pub account: Option<String>,
}

impl MockProvider {
    pub fn some(source: IdentitySource, account: &str) -> Arc<dyn IdentityProvider> {
        Arc::new(Self {
            source,
            account: Some(account.to_string()),
        })
    }

    pub fn none(source: IdentitySource) -> Arc<dyn IdentityProvider> {
        Arc::new(Self {
            source,
            account: None,
        })
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    fn source(&self) -> IdentitySource {
        self.source
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        self.account
            .as_deref()
            .and_then(|raw| IdentityResult::from_account(raw, self.source))
    }
}

/// Provider that never answers
pub struct HangingProvider(pub IdentitySource);

#[async_trait]
impl IdentityProvider for HangingProvider {
    fn source(&self) -> IdentitySource {
        self.0
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        std::future::pending::<()>().await;
        None
    }
}

/// Command runner with canned stdout per program; unknown programs exit non-zero
#[derive(Default)]
pub struct MockCommandRunner {
    outputs: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockCommandRunner {
    pub fn with_output(mut self, program: &str, stdout: &str) -> Self {
        self.outputs.insert(program.to_string(), stdout.to_string());
        self
    }

    pub fn call_count(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == program)
            .count()
    }
}

#[async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(
        &self,
        program: &str,
        _args: &[String],
        _timeout: Duration,
    ) -> Result<String, CommandError> {
        self.calls.lock().unwrap().push(program.to_string());
        self.outputs
            .get(program)
            .cloned()
            .ok_or_else(|| CommandError::NonZeroExit {
                program: program.to_string(),
                code: Some(1),
            })
    }
}

/// Command runner whose tools hang until their timeout expires
#[derive(Default)]
pub struct HungCommandRunner;

#[async_trait]
impl CommandRunner for HungCommandRunner {
    async fn run(
        &self,
        program: &str,
        _args: &[String],
        timeout: Duration,
    ) -> Result<String, CommandError> {
        tokio::time::sleep(timeout).await;
        Err(CommandError::Timeout {
            program: program.to_string(),
            timeout,
        })
    }
}

/// The full source chain with every OS-backed source failing and the
/// environment fallback reading only `env`.
pub fn chain_with_env(env: &[(&str, &str)]) -> Vec<Arc<dyn IdentityProvider>> {
    let vars: Vec<(String, String)> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    vec![
        MockProvider::none(IdentitySource::ConsoleSession),
        MockProvider::none(IdentitySource::ProcessOwner),
        MockProvider::none(IdentitySource::DirectoryService),
        MockProvider::none(IdentitySource::ShellWhoami),
        Arc::new(EnvironmentProvider::from_vars(vars)),
    ]
}

pub fn create_test_app_state(providers: Vec<Arc<dyn IdentityProvider>>) -> AppState {
    create_test_app_state_with(Config::test_config(), providers, SYSTEMINFO_WORKGROUP)
}

pub fn create_test_app_state_with(
    config: Config,
    providers: Vec<Arc<dyn IdentityProvider>>,
    systeminfo: &str,
) -> AppState {
    let runner: Arc<dyn CommandRunner> =
        Arc::new(MockCommandRunner::default().with_output("systeminfo", systeminfo));
    let resolver = IdentityResolver::new(providers, Duration::from_millis(300));
    let domain_probe = DomainProbe::new(runner, Duration::from_millis(300));
    AppState::new(config, resolver, domain_probe)
}
