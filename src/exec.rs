//! Command execution
//!
//! Spawns whitelisted and confirmed-arbitrary commands as subprocesses.
//! Every path resolves to a `CommandOutput` — spawn failures and timeouts
//! become a non-zero exit code with the message in stderr, never a
//! propagated error.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Timeout for whitelisted command execution
pub const WHITELIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for confirmed arbitrary command execution
pub const RAW_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for short built-ins (lock, shutdown)
const BUILTIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Captured result of a command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Process exit code; -1 for spawn failures and timeouts
    pub code: i32,

    /// Captured stdout, trimmed
    pub stdout: String,

    /// Captured stderr or failure message, trimmed
    pub stderr: String,
}

impl CommandOutput {
    /// A successful execution with a synthesized message
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: text.into(),
            stderr: String::new(),
        }
    }

    /// A failed execution with a reason
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            code: -1,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    /// Whether the command exited cleanly
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.code == 0
    }
}

/// Executes OS commands on behalf of the handler flow
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a whitelisted command with arguments
    async fn run(&self, command: &str, args: &[String], timeout: Duration) -> CommandOutput;

    /// Run a raw command line verbatim (after spoken confirmation)
    async fn run_raw(&self, command_line: &str, timeout: Duration) -> CommandOutput;
}

/// Production runner backed by subprocesses
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &str, args: &[String], timeout: Duration) -> CommandOutput {
        match command {
            // Launchers detach and report synthesized success
            "calc" => spawn_detached("calc.exe", &[]),
            "music" => {
                let path = music_folder();
                let display = path.display().to_string();
                let out = spawn_detached("explorer", &[display.as_str()]);
                if out.ok() {
                    CommandOutput::message(format!("opened music folder {display}"))
                } else {
                    out
                }
            }
            "lock" => {
                run_argv(
                    "rundll32.exe",
                    &["user32.dll,LockWorkStation".to_string()],
                    BUILTIN_TIMEOUT,
                )
                .await
            }
            "shutdown" => run_argv("shutdown", args, BUILTIN_TIMEOUT).await,
            _ => run_argv(command, args, timeout).await,
        }
    }

    async fn run_raw(&self, command_line: &str, timeout: Duration) -> CommandOutput {
        let Some(argv) = shlex::split(command_line) else {
            return CommandOutput::failure("unparsable command line");
        };
        let Some((program, args)) = argv.split_first() else {
            return CommandOutput::failure("empty command");
        };
        run_argv(program, args, timeout).await
    }
}

/// Run a program to completion with a bounded timeout, capturing output
pub(crate) async fn run_argv(program: &str, args: &[String], timeout: Duration) -> CommandOutput {
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CommandOutput::failure(format!("failed to spawn {program}: {e}"));
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Err(_) => CommandOutput::failure(format!("timed out after {}s", timeout.as_secs())),
        Ok(Err(e)) => CommandOutput::failure(format!("process error: {e}")),
        Ok(Ok(output)) => CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        },
    }
}

/// Spawn a program without waiting for it
fn spawn_detached(program: &str, args: &[&str]) -> CommandOutput {
    match std::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
    {
        Ok(_) => CommandOutput::message(format!("opened {program}")),
        Err(e) => CommandOutput::failure(format!("failed to launch {program}: {e}")),
    }
}

/// The user's music folder
fn music_folder() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from("Music"),
        |dirs| {
            dirs.audio_dir()
                .map_or_else(|| dirs.home_dir().join("Music"), std::path::Path::to_path_buf)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_raw_command_fails() {
        let runner = ProcessRunner;
        let out = runner.run_raw("", Duration::from_secs(1)).await;
        assert!(!out.ok());
        assert!(out.stderr.contains("empty command"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_not_raised() {
        let out = run_argv("definitely-not-a-real-binary", &[], Duration::from_secs(1)).await;
        assert_eq!(out.code, -1);
        assert!(out.stderr.contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_raw_command_captures_output() {
        let runner = ProcessRunner;
        let out = runner.run_raw("echo hello world", Duration::from_secs(5)).await;
        assert!(out.ok());
        assert_eq!(out.stdout, "hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_reported_as_failure() {
        let out = run_argv("sleep", &["5".to_string()], Duration::from_millis(100)).await;
        assert_eq!(out.code, -1);
        assert!(out.stderr.contains("timed out"));
    }
}
