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

//! Bounded execution of external identity tools.
//!
//! A child that outlives its timeout is killed when its future is dropped
//! (`kill_on_drop`), so a hung tool never keeps running behind a request.

use crate::core::errors::CommandError;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Hides console windows for tools launched from a service.
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs an external program and returns its trimmed stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, CommandError>;
}

/// Runs real OS processes via `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, CommandError> {
        debug!("SystemCommandRunner: running '{}' with args {:?}", program, args);

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let child = command.spawn().map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    timeout,
                })
            }
        };

        if !output.status.success() {
            debug!(
                program,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "command exited unsuccessfully"
            );
            return Err(CommandError::NonZeroExit {
                program: program.to_string(),
                code: output.status.code(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(CommandError::EmptyOutput {
                program: program.to_string(),
            });
        }

        Ok(stdout)
    }
}

/// Arguments for a non-interactive PowerShell script invocation.
pub fn powershell_args(script: &str) -> Vec<String> {
    vec![
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        "-Command".to_string(),
        script.to_string(),
    ]
}

/// First non-blank line of tool output.
pub fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|line| !line.is_empty())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line_skips_blank_lines() {
        assert_eq!(first_line("\r\n\n  CORP\\bob \r\nother"), Some("CORP\\bob"));
        assert_eq!(first_line("   \n\n"), None);
    }

    #[test]
    fn test_powershell_args_are_non_interactive() {
        let args = powershell_args("Get-Date");
        assert_eq!(args.last().map(String::as_str), Some("Get-Date"));
        assert!(args.iter().any(|a| a == "-NonInteractive"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let result = SystemCommandRunner
            .run(
                "definitely-not-a-real-binary-4f1c",
                &[],
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_trimmed() {
        let args = vec![
            "-c".to_string(),
            "printf '%s\\n' '  CORP\\bob  '".to_string(),
        ];
        let out = SystemCommandRunner
            .run("sh", &args, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "CORP\\bob");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let args = vec!["-c".to_string(), "echo nope; exit 3".to_string()];
        let result = SystemCommandRunner
            .run("sh", &args, Duration::from_secs(5))
            .await;
        assert!(matches!(
            result,
            Err(CommandError::NonZeroExit { code: Some(3), .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_error() {
        let args = vec!["-c".to_string(), "true".to_string()];
        let result = SystemCommandRunner
            .run("sh", &args, Duration::from_secs(5))
            .await;
        assert!(matches!(result, Err(CommandError::EmptyOutput { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_command_times_out() {
        let args = vec!["-c".to_string(), "sleep 5".to_string()];
        let started = std::time::Instant::now();
        let result = SystemCommandRunner
            .run("sh", &args, Duration::from_millis(200))
            .await;
        assert!(matches!(result, Err(CommandError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
