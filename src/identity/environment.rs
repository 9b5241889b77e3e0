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

//! Last-resort identity from process environment variables.

use crate::core::constants::identity::USERNAME_ENV_VARS;
use crate::core::models::{IdentityResult, IdentitySource};
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use std::collections::HashMap;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct EnvironmentProvider {
    lookup: EnvLookup,
}

impl EnvironmentProvider {
    /// Reads the live process environment on every lookup.
    pub fn from_process_env() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Fixed set of variables, for hosts that pass a captured environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_lookup(move |key| vars.get(key).cloned())
    }

    /// First non-blank of `USERNAME`, `USER`.
    pub fn account_name(&self) -> Option<String> {
        USERNAME_ENV_VARS
            .iter()
            .filter_map(|key| (self.lookup)(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

#[async_trait]
impl IdentityProvider for EnvironmentProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::EnvironmentFallback
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        self.account_name()
            .and_then(|name| IdentityResult::from_account(&name, IdentitySource::EnvironmentFallback))
    }
}
