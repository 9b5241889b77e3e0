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

// Configuration management

use crate::core::constants::config::*;
use crate::core::errors::ServiceError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Service configuration loaded from environment variables
///
/// Everything has a default; only malformed values are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // External command timeouts
    pub command_timeout_secs: u64,
    pub powershell_timeout_secs: u64,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub cors_enabled: bool,

    pub service_name: String,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            bind_address: get_or_default(&lookup, ENV_HOST, DEFAULT_HOST),
            port: parse_port(&lookup)?,
            command_timeout_secs: parse_u64_or_default(
                &lookup,
                ENV_COMMAND_TIMEOUT_SECS,
                DEFAULT_COMMAND_TIMEOUT_SECS,
            )?,
            powershell_timeout_secs: parse_u64_or_default(
                &lookup,
                ENV_POWERSHELL_TIMEOUT_SECS,
                DEFAULT_POWERSHELL_TIMEOUT_SECS,
            )?,
            request_timeout_secs: parse_u64_or_default(
                &lookup,
                ENV_REQUEST_TIMEOUT_SECS,
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            shutdown_grace_secs: parse_u64_or_default(
                &lookup,
                ENV_SHUTDOWN_GRACE_SECS,
                DEFAULT_SHUTDOWN_GRACE_SECS,
            )?,
            cors_enabled: parse_bool_or_default(&lookup, ENV_CORS, true)?,
            service_name: get_or_default(&lookup, ENV_SERVICE_NAME, DEFAULT_SERVICE_NAME),
            log_level: get_or_default(&lookup, ENV_LOG_LEVEL, "info"),
            log_format: get_or_default(&lookup, ENV_LOG_FORMAT, "text"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Load only what a one-shot resolution reads: tool timeouts and logging.
    ///
    /// Listener and HTTP settings keep their defaults and are not parsed, so a
    /// bad `WHOAMI_PORT` does not stop `resolve`.
    pub fn resolve_only_from_env() -> Result<Self, ServiceError> {
        Self::resolve_only_from_lookup(|key| env::var(key).ok())
    }

    pub fn resolve_only_from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            command_timeout_secs: parse_u64_or_default(
                &lookup,
                ENV_COMMAND_TIMEOUT_SECS,
                DEFAULT_COMMAND_TIMEOUT_SECS,
            )?,
            powershell_timeout_secs: parse_u64_or_default(
                &lookup,
                ENV_POWERSHELL_TIMEOUT_SECS,
                DEFAULT_POWERSHELL_TIMEOUT_SECS,
            )?,
            log_level: get_or_default(&lookup, ENV_LOG_LEVEL, "info"),
            log_format: get_or_default(&lookup, ENV_LOG_FORMAT, "text"),
            ..Self::default()
        };

        config.validate_log_format()?;

        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.bind_address.trim().is_empty() {
            return Err(ServiceError::ConfigurationError(format!(
                "{} must not be empty",
                ENV_HOST
            )));
        }

        if self.port == 0 {
            return Err(ServiceError::ConfigurationError(format!(
                "{} must be between 1 and 65535",
                ENV_PORT
            )));
        }

        self.validate_log_format()
    }

    fn validate_log_format(&self) -> Result<(), ServiceError> {
        match self.log_format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ServiceError::ConfigurationError(format!(
                "Invalid {} value '{}': expected 'json' or 'text'",
                ENV_LOG_FORMAT, other
            ))),
        }
    }

    /// `host:port` the listener binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn powershell_timeout(&self) -> Duration {
        Duration::from_secs(self.powershell_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Upper bound for a single identity source, whatever tool it runs.
    pub fn source_timeout(&self) -> Duration {
        self.command_timeout().max(self.powershell_timeout())
    }

    /// Total time one identity lookup may take inside a request: four fifths
    /// of the request timeout, so identity routes answer before the 408 fires.
    pub fn resolution_deadline(&self) -> Duration {
        self.request_timeout() * 4 / 5
    }

    /// Configuration for tests: ephemeral loopback port, short timeouts.
    pub fn test_config() -> Self {
        Self {
            bind_address: DEFAULT_HOST.to_string(),
            port: 0,
            command_timeout_secs: 1,
            powershell_timeout_secs: 1,
            request_timeout_secs: 5,
            shutdown_grace_secs: 1,
            cors_enabled: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "debug".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            powershell_timeout_secs: DEFAULT_POWERSHELL_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            cors_enabled: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

/// Get a value or return the default; empty values count as unset
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn parse_port<F>(lookup: &F) -> Result<u16, ServiceError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(port_str) = lookup(ENV_PORT) else {
        return Ok(DEFAULT_PORT);
    };

    let port = port_str.trim().parse::<u16>().map_err(|e| {
        ServiceError::ConfigurationError(format!(
            "Invalid {} value '{}': {}",
            ENV_PORT, port_str, e
        ))
    })?;

    if port == 0 {
        return Err(ServiceError::ConfigurationError(format!(
            "{} must be between 1 and 65535",
            ENV_PORT
        )));
    }

    Ok(port)
}

/// Parse u64 or return default; zero is rejected
fn parse_u64_or_default<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ServiceError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => {
            let parsed = value.trim().parse::<u64>().map_err(|e| {
                ServiceError::ConfigurationError(format!(
                    "Invalid {} value '{}': {}",
                    key, value, e
                ))
            })?;

            if parsed == 0 {
                return Err(ServiceError::ConfigurationError(format!(
                    "{} must be greater than 0",
                    key
                )));
            }

            Ok(parsed)
        }
        None => Ok(default),
    }
}

fn parse_bool_or_default<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ServiceError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ServiceError::ConfigurationError(format!(
                "Invalid {} value '{}': expected true or false",
                key, value
            ))),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ServiceError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.port, 7777);
        assert_eq!(config.command_timeout_secs, 5);
        assert_eq!(config.powershell_timeout_secs, 10);
        assert!(config.cors_enabled);
        assert_eq!(config.listen_addr(), "127.0.0.1:7777");
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("WHOAMI_HOST", "0.0.0.0"),
            ("WHOAMI_PORT", "8088"),
            ("WHOAMI_CORS", "false"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8088");
        assert!(!config.cors_enabled);
        assert_eq!(config.log_format, "json");
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(load(&[("WHOAMI_PORT", "not-a-port")]).is_err());
        assert!(load(&[("WHOAMI_PORT", "0")]).is_err());
        assert!(load(&[("WHOAMI_PORT", "70000")]).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load(&[("WHOAMI_COMMAND_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_resolve_only_ignores_listener_settings() {
        let vars: HashMap<&str, &str> = [
            ("WHOAMI_PORT", "not-a-port"),
            ("WHOAMI_CORS", "maybe"),
            ("WHOAMI_COMMAND_TIMEOUT_SECS", "2"),
        ]
        .into_iter()
        .collect();
        let config =
            Config::resolve_only_from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.command_timeout(), Duration::from_secs(2));
        assert_eq!(config.port, 7777);
    }

    #[test]
    fn test_resolve_only_rejects_bad_timeout() {
        let result = Config::resolve_only_from_lookup(|key| {
            (key == "WHOAMI_POWERSHELL_TIMEOUT_SECS").then(|| "0".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_resolution_deadline_below_request_timeout() {
        let config = load(&[]).unwrap();
        assert_eq!(config.resolution_deadline(), Duration::from_secs(24));

        let config = load(&[("WHOAMI_REQUEST_TIMEOUT_SECS", "1")]).unwrap();
        assert_eq!(config.resolution_deadline(), Duration::from_millis(800));
    }

    #[test]
    fn test_source_timeout_is_larger_bound() {
        let config = load(&[
            ("WHOAMI_COMMAND_TIMEOUT_SECS", "3"),
            ("WHOAMI_POWERSHELL_TIMEOUT_SECS", "9"),
        ])
        .unwrap();
        assert_eq!(config.source_timeout(), Duration::from_secs(9));
    }
}
