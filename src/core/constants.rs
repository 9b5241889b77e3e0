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

//! whoami-service Constants - Single source of truth for configuration values.

/// Configuration Environment Variables
pub mod config {
    pub const ENV_HOST: &str = "WHOAMI_HOST";
    pub const ENV_PORT: &str = "WHOAMI_PORT";
    pub const ENV_COMMAND_TIMEOUT_SECS: &str = "WHOAMI_COMMAND_TIMEOUT_SECS";
    pub const ENV_POWERSHELL_TIMEOUT_SECS: &str = "WHOAMI_POWERSHELL_TIMEOUT_SECS";
    pub const ENV_REQUEST_TIMEOUT_SECS: &str = "WHOAMI_REQUEST_TIMEOUT_SECS";
    pub const ENV_SHUTDOWN_GRACE_SECS: &str = "WHOAMI_SHUTDOWN_GRACE_SECS";
    pub const ENV_SERVICE_NAME: &str = "WHOAMI_SERVICE_NAME";
    pub const ENV_CORS: &str = "WHOAMI_CORS";
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 7777;
    pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;
    pub const DEFAULT_POWERSHELL_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
    pub const DEFAULT_SERVICE_NAME: &str = "whoami-service";

    /// Reported when the OS hostname cannot be read.
    pub const UNKNOWN_HOST: &str = "unknown";
}

/// Identity resolution
pub mod identity {
    /// Returned when every source fails or reports a system account.
    pub const UNKNOWN_USER: &str = "unknown";

    /// Non-human accounts that are never reported as the logged-in user.
    pub const SYSTEM_ACCOUNTS: &[&str] = &["system", "local service", "network service"];

    /// Environment variables consulted for the fallback identity, in order.
    pub const USERNAME_ENV_VARS: &[&str] = &["USERNAME", "USER"];

    /// Desktop shell whose owner is treated as the interactive user.
    pub const DESKTOP_SHELL_PROCESS: &str = "explorer";

    /// `WTSGetActiveConsoleSessionId` result when no session is attached.
    pub const NO_CONSOLE_SESSION: u32 = 0xFFFF_FFFF;
}

/// External tools invoked by the identity sources
pub mod commands {
    pub const WHOAMI: &str = "whoami";
    pub const QUERY: &str = "query";
    pub const POWERSHELL: &str = "powershell";
    pub const SYSTEMINFO: &str = "systeminfo";
}

/// HTTP routes
pub mod routes {
    pub const ROOT: &str = "/";
    pub const WHOAMI: &str = "/whoami";
    pub const USERNAME: &str = "/username";
    pub const ACTIVE_USER: &str = "/active-user";
    pub const HEALTHZ: &str = "/healthz";
    pub const STATUS: &str = "/status";
}
