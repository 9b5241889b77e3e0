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

//! Active console session lookup.
//!
//! On Windows the WTS session API is asked first. If it reports no console
//! session that answer is final; if the API itself fails, `query user` output
//! is parsed instead. Elsewhere only the `query user` path exists, and it
//! simply fails when the tool is absent.

use crate::core::constants::commands::QUERY;
use crate::core::models::{IdentityResult, IdentitySource};
use crate::identity::command::CommandRunner;
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ConsoleSessionProvider {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    #[cfg_attr(not(windows), allow(dead_code))]
    use_session_api: bool,
}

impl ConsoleSessionProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            use_session_api: cfg!(windows),
        }
    }

    /// Skip the native session API and rely on `query user` alone.
    pub fn command_only(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            use_session_api: false,
        }
    }

    async fn query_user(&self) -> Option<IdentityResult> {
        let args = vec!["user".to_string()];
        match self.runner.run(QUERY, &args, self.timeout).await {
            Ok(output) => parse_query_user(&output),
            Err(e) => {
                debug!(error = %e, "query user failed; treating as no console session");
                None
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for ConsoleSessionProvider {
    fn source(&self) -> IdentitySource {
        IdentitySource::ConsoleSession
    }

    async fn try_resolve(&self) -> Option<IdentityResult> {
        #[cfg(windows)]
        if self.use_session_api {
            match tokio::task::spawn_blocking(wts::active_console_user).await {
                Ok(Ok(found)) => return found,
                Ok(Err(e)) => debug!(error = %e, "WTS lookup failed; falling back to query user"),
                Err(e) => debug!(error = %e, "WTS lookup task failed"),
            }
        }

        self.query_user().await
    }
}

/// One row of `query user` output.
#[derive(Debug, PartialEq, Eq)]
struct SessionRow<'a> {
    username: &'a str,
    session_name: Option<&'a str>,
    id: u32,
    state: &'a str,
}

fn parse_session_row(line: &str) -> Option<SessionRow<'_>> {
    let line = line.trim_start().trim_start_matches('>');
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }

    // Disconnected sessions have an empty SESSIONNAME column.
    if tokens.len() >= 4 {
        if let Ok(id) = tokens[2].parse::<u32>() {
            return Some(SessionRow {
                username: tokens[0],
                session_name: Some(tokens[1]),
                id,
                state: tokens[3],
            });
        }
    }

    let id = tokens[1].parse::<u32>().ok()?;
    Some(SessionRow {
        username: tokens[0],
        session_name: None,
        id,
        state: tokens[2],
    })
}

/// Pick the interactive user from `query user` output.
///
/// The `console` row in state `Active` wins; otherwise the first `Active` row.
pub fn parse_query_user(output: &str) -> Option<IdentityResult> {
    let rows: Vec<SessionRow<'_>> = output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.trim_start().to_uppercase().starts_with("USERNAME"))
        .filter_map(parse_session_row)
        .collect();

    fn is_active(row: &&SessionRow<'_>) -> bool {
        row.state.eq_ignore_ascii_case("active")
    }

    let chosen = rows
        .iter()
        .filter(is_active)
        .find(|row| {
            row.session_name
                .is_some_and(|name| name.eq_ignore_ascii_case("console"))
        })
        .or_else(|| rows.iter().find(is_active))?;

    IdentityResult::from_account(chosen.username, IdentitySource::ConsoleSession)
        .map(|id| id.with_session_id(chosen.id))
}

#[cfg(windows)]
mod wts {
    use crate::core::constants::identity::NO_CONSOLE_SESSION;
    use crate::core::models::{IdentityResult, IdentitySource};
    use windows::core::PWSTR;
    use windows::Win32::System::RemoteDesktop::{
        WTSDomainName, WTSFreeMemory, WTSGetActiveConsoleSessionId,
        WTSQuerySessionInformationW, WTSUserName, WTS_CURRENT_SERVER_HANDLE, WTS_INFO_CLASS,
    };

    /// `Ok(None)` means no user is attached to the console.
    pub(super) fn active_console_user() -> Result<Option<IdentityResult>, String> {
        // SAFETY: takes no arguments and has no preconditions.
        let session_id = unsafe { WTSGetActiveConsoleSessionId() };
        if session_id == NO_CONSOLE_SESSION {
            return Ok(None);
        }

        let username = query_string(session_id, WTSUserName)?;
        let username = username.trim().to_string();
        // Logon screen: a session exists but nobody is signed in.
        if username.is_empty() {
            return Ok(None);
        }

        let domain = query_string(session_id, WTSDomainName)
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let raw = match &domain {
            Some(domain) => format!("{}\\{}", domain, username),
            None => username.clone(),
        };

        Ok(Some(IdentityResult {
            raw,
            domain,
            username,
            source: IdentitySource::ConsoleSession,
            session_id: Some(session_id),
        }))
    }

    fn query_string(session_id: u32, class: WTS_INFO_CLASS) -> Result<String, String> {
        let mut buffer = PWSTR::null();
        let mut bytes = 0u32;

        // SAFETY: out-pointers are valid locals; the buffer is released below.
        unsafe {
            WTSQuerySessionInformationW(
                Some(WTS_CURRENT_SERVER_HANDLE),
                session_id,
                class,
                &mut buffer,
                &mut bytes,
            )
        }
        .map_err(|e| format!("WTSQuerySessionInformationW failed: {}", e))?;

        if buffer.is_null() {
            return Ok(String::new());
        }

        // SAFETY: on success the API returns a NUL-terminated UTF-16 string.
        let value = unsafe { buffer.to_string() }.map_err(|e| e.to_string());
        // SAFETY: buffer was allocated by WTSQuerySessionInformationW.
        unsafe { WTSFreeMemory(buffer.0 as *mut std::ffi::c_void) };
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::command::fake::ScriptedRunner;

    const QUERY_USER_CONSOLE: &str = "\
 USERNAME              SESSIONNAME        ID  STATE   IDLE TIME  LOGON TIME
 alice                                     2  Disc         1:02  10/18/2026 8:12 AM
>bob                   console             1  Active      none   10/19/2026 9:00 AM
";

    #[test]
    fn test_console_row_wins() {
        let id = parse_query_user(QUERY_USER_CONSOLE).unwrap();
        assert_eq!(id.username, "bob");
        assert_eq!(id.session_id, Some(1));
        assert_eq!(id.domain, None);
        assert_eq!(id.source, IdentitySource::ConsoleSession);
    }

    #[test]
    fn test_first_active_row_when_no_console() {
        let output = "\
 USERNAME              SESSIONNAME        ID  STATE   IDLE TIME  LOGON TIME
 carol                 rdp-tcp#3           4  Active          .  10/19/2026 7:45 AM
 dave                  rdp-tcp#4           5  Active          .  10/19/2026 7:50 AM
";
        let id = parse_query_user(output).unwrap();
        assert_eq!(id.username, "carol");
        assert_eq!(id.session_id, Some(4));
    }

    #[test]
    fn test_only_disconnected_sessions_is_none() {
        let output = "\
 USERNAME              SESSIONNAME        ID  STATE   IDLE TIME  LOGON TIME
 alice                                     2  Disc         1:02  10/18/2026 8:12 AM
";
        assert!(parse_query_user(output).is_none());
    }

    #[test]
    fn test_disconnected_row_parses_without_session_name() {
        let row = parse_session_row(" alice  2  Disc  1:02  10/18/2026 8:12 AM").unwrap();
        assert_eq!(row.username, "alice");
        assert_eq!(row.session_name, None);
        assert_eq!(row.id, 2);
        assert_eq!(row.state, "Disc");
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_query_user("No User exists for *").is_none());
        assert!(parse_query_user("").is_none());
    }

    #[tokio::test]
    async fn test_provider_uses_query_user() {
        let runner = Arc::new(ScriptedRunner::default().with_output("query", QUERY_USER_CONSOLE));
        let provider = ConsoleSessionProvider::command_only(runner.clone(), Duration::from_secs(1));

        let id = provider.try_resolve().await.unwrap();
        assert_eq!(id.username, "bob");
        assert_eq!(runner.calls()[0].1, vec!["user".to_string()]);
    }

    #[tokio::test]
    async fn test_provider_tool_failure_is_none() {
        let runner = Arc::new(ScriptedRunner::default());
        let provider = ConsoleSessionProvider::command_only(runner, Duration::from_secs(1));
        assert!(provider.try_resolve().await.is_none());
    }
}
