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

//! Prioritized identity resolution.
//!
//! Sources are tried strictly in order and the first non-empty, non-system
//! answer is returned as-is. There is no ranking between results and no
//! caching: every call queries the sources again.

use crate::config::Config;
use crate::core::models::{IdentityResult, IdentitySource};
use crate::identity::command::{CommandRunner, SystemCommandRunner};
use crate::identity::{default_providers, is_system_account, IdentityProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub struct IdentityResolver {
    providers: Vec<Arc<dyn IdentityProvider>>,
    source_timeout: Duration,
    /// Budget for a whole pass over the chain; `None` means unbounded.
    deadline: Option<Duration>,
}

impl IdentityResolver {
    pub fn new(providers: Vec<Arc<dyn IdentityProvider>>, source_timeout: Duration) -> Self {
        Self {
            providers,
            source_timeout,
            deadline: None,
        }
    }

    /// Bound a full resolution pass. Sources still pending when it runs out
    /// get no time of their own.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Production chain backed by real OS commands.
    pub fn from_config(config: &Config) -> Self {
        Self::with_runner(config, Arc::new(SystemCommandRunner))
    }

    pub fn with_runner(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(default_providers(config, runner), config.source_timeout())
            .with_deadline(config.resolution_deadline())
    }

    /// Sources in the order they are consulted.
    pub fn sources(&self) -> Vec<IdentitySource> {
        self.providers.iter().map(|p| p.source()).collect()
    }

    /// Resolve the current user. Never fails and never returns an empty username;
    /// the worst case is the `"unknown"` sentinel.
    pub async fn resolve(&self) -> IdentityResult {
        self.run_chain(Instant::now(), None).await.0
    }

    /// Resolve the current user and report what `observed` answered on its own.
    ///
    /// The observed source is queried once; its answer feeds both the chain and
    /// the second value. It is queried separately only when the chain stopped
    /// before reaching it, and then only with what is left of the deadline.
    pub async fn resolve_observing(
        &self,
        observed: IdentitySource,
    ) -> (IdentityResult, Option<IdentityResult>) {
        let started = Instant::now();
        match self.run_chain(started, Some(observed)).await {
            (identity, Some(seen)) => (identity, seen),
            (identity, None) => {
                let seen = match self.providers.iter().find(|p| p.source() == observed) {
                    Some(provider) => self.query(provider.as_ref(), self.budget(started)).await,
                    None => None,
                };
                (identity, seen)
            }
        }
    }

    /// Run a single source by kind, e.g. only the console session.
    ///
    /// `None` when that source is not configured or has nothing to report.
    pub async fn resolve_source(&self, source: IdentitySource) -> Option<IdentityResult> {
        let provider = self.providers.iter().find(|p| p.source() == source)?;
        let budget = self.budget(Instant::now());
        self.query(provider.as_ref(), budget).await
    }

    /// Walk the chain. The second value is `Some(answer)` once `observe` was queried.
    async fn run_chain(
        &self,
        started: Instant,
        observe: Option<IdentitySource>,
    ) -> (IdentityResult, Option<Option<IdentityResult>>) {
        let mut observed = None;

        for provider in &self.providers {
            let source = provider.source();
            let answer = self.query(provider.as_ref(), self.budget(started)).await;
            if observe == Some(source) {
                observed = Some(answer.clone());
            }

            match answer {
                Some(identity) if is_system_account(&identity.username) => {
                    debug!(
                        source = %source,
                        username = %identity.username,
                        "Skipping system account"
                    );
                }
                Some(identity) => {
                    debug!(
                        source = %source,
                        username = %identity.username,
                        "Identity resolved"
                    );
                    return (identity, observed);
                }
                None => {
                    debug!(source = %source, "Identity source returned nothing");
                }
            }
        }

        warn!("No identity source produced a usable user; returning sentinel");
        (IdentityResult::unknown(), observed)
    }

    /// Time the next source may use: its own timeout, capped by what is left of the pass.
    fn budget(&self, started: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .source_timeout
                .min(deadline.saturating_sub(started.elapsed())),
            None => self.source_timeout,
        }
    }

    async fn query(
        &self,
        provider: &dyn IdentityProvider,
        budget: Duration,
    ) -> Option<IdentityResult> {
        // The source is polled once before the timer is checked, so sources
        // that answer immediately still do so with no budget left.
        match tokio::time::timeout(budget, provider.try_resolve()).await {
            Ok(Some(identity)) if !identity.username.trim().is_empty() => Some(identity),
            Ok(_) => None,
            Err(_) => {
                warn!(
                    source = %provider.source(),
                    budget_ms = budget.as_millis() as u64,
                    "Identity source timed out"
                );
                None
            }
        }
    }
}
