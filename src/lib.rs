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

//! whoami-service: local identity endpoint.
//!
//! Resolves the interactive user of the machine from a prioritized chain of
//! identity sources (console session, desktop-shell owner, directory service,
//! `whoami`, environment) and serves the answer as JSON over loopback HTTP.

pub mod api;
pub mod config;
pub mod core;
pub mod identity;
pub mod server;
pub mod utils;
