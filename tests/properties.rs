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

#[path = "common/mod.rs"]
mod common;

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use whoami_service::core::models::{IdentityResult, IdentitySource};
use whoami_service::identity::{is_system_account, IdentityProvider, IdentityResolver};

use common::MockProvider;

const SOURCES: [IdentitySource; 5] = [
    IdentitySource::ConsoleSession,
    IdentitySource::ProcessOwner,
    IdentitySource::DirectoryService,
    IdentitySource::ShellWhoami,
    IdentitySource::EnvironmentFallback,
];

/// Account strings a source might plausibly report, including junk.
fn account() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   ".to_string())),
        Just(Some("NT AUTHORITY\\SYSTEM".to_string())),
        Just(Some("NT AUTHORITY\\LOCAL SERVICE".to_string())),
        Just(Some("CORP\\WS-0142$".to_string())),
        Just(Some("CORP\\".to_string())),
        "[A-Za-z]{1,8}\\\\[A-Za-z0-9._-]{1,12}".prop_map(Some),
        "\\PC{0,16}".prop_map(Some),
    ]
}

proptest! {
    #[test]
    fn test_resolve_never_empty_never_system(accounts in prop::collection::vec(account(), 5)) {
        let providers: Vec<Arc<dyn IdentityProvider>> = SOURCES
            .iter()
            .zip(accounts)
            .map(|(source, account)| match account {
                Some(raw) => MockProvider::some(*source, &raw),
                None => MockProvider::none(*source),
            })
            .collect();
        let resolver = IdentityResolver::new(providers, Duration::from_millis(100));

        let rt = Runtime::new().unwrap();
        let id = rt.block_on(resolver.resolve());

        prop_assert!(!id.username.trim().is_empty());
        prop_assert!(!is_system_account(&id.username));
    }

    #[test]
    fn test_from_account_splits_on_first_backslash(
        domain in "[A-Za-z0-9-]{1,10}",
        user in "[A-Za-z0-9._\\\\-]{1,12}",
    ) {
        let raw = format!("{}\\{}", domain, user);
        match IdentityResult::from_account(&raw, IdentitySource::ShellWhoami) {
            Some(id) => {
                prop_assert_eq!(id.domain.as_deref(), Some(domain.as_str()));
                prop_assert_eq!(id.username, user.trim().to_string());
                prop_assert_eq!(id.raw, raw);
            }
            None => prop_assert!(user.trim().is_empty()),
        }
    }

    #[test]
    fn test_identity_json_roundtrip(
        raw in "\\PC{1,24}",
        session_id in proptest::option::of(0u32..100),
    ) {
        if let Some(mut id) = IdentityResult::from_account(&raw, IdentitySource::ProcessOwner) {
            id.session_id = session_id;
            let json = serde_json::to_string(&id).unwrap();
            let back: IdentityResult = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, id);
        }
    }
}
