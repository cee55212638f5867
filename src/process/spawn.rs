//! Process spawning for one-shot and persistent execution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use super::command::{Command, CommandResult};
use super::pipe::{CommandProcess, PipedProcess};
use crate::config::{Charset, ExifToolConfig};
use crate::{Error, Result};

/// Starts ExifTool processes.
///
/// [`DefaultExecutor`] spawns real subprocesses; tests substitute their own
/// implementation to observe spawns without running ExifTool.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion and capture its output.
    async fn execute(&self, command: &Command) -> Result<CommandResult>;

    /// Spawn `command` and return a live handle to its streams.
    async fn start(&self, command: &Command) -> Result<Box<dyn CommandProcess>>;
}

/// Executor backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct DefaultExecutor {
    charset: Charset,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    clear_env: bool,
    close_timeout: Duration,
}

impl DefaultExecutor {
    pub fn new() -> Self {
        Self {
            charset: Charset::default(),
            working_directory: None,
            env_vars: HashMap::new(),
            clear_env: false,
            close_timeout: crate::config::DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Executor using the process options of `config`.
    pub fn from_config(config: &ExifToolConfig) -> Self {
        Self {
            charset: config.charset,
            working_directory: config.working_directory.clone(),
            env_vars: config.env_vars.clone(),
            clear_env: !config.inherit_env,
            close_timeout: config.close_timeout,
        }
    }

    /// Build a tokio Command from a command line.
    fn build_command(&self, command: &Command) -> TokioCommand {
        let mut cmd = TokioCommand::new(command.program());
        cmd.args(command.arguments());

        if let Some(ref dir) = self.working_directory {
            cmd.current_dir(dir);
        }

        if self.clear_env {
            cmd.env_clear();
        }
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        cmd
    }
}

impl Default for DefaultExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a spawn failure, singling out a missing or unusable executable.
fn spawn_error(command: &Command, e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            tracing::error!(path = command.program(), error = %e, "cannot run exiftool");
            Error::ExecutableNotFound {
                path: command.program().to_string(),
            }
        }
        _ => {
            tracing::error!(command = %command, error = %e, "failed to spawn exiftool");
            Error::ProcessSpawn(e)
        }
    }
}

#[async_trait]
impl CommandExecutor for DefaultExecutor {
    async fn execute(&self, command: &Command) -> Result<CommandResult> {
        tracing::debug!(command = %command, "execute command");

        let output = self
            .build_command(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(command, e))?;

        Ok(CommandResult {
            exit_code: output.status.code(),
            stdout: self.charset.decode(&output.stdout).into_owned(),
            stderr: self.charset.decode(&output.stderr).into_owned(),
        })
    }

    async fn start(&self, command: &Command) -> Result<Box<dyn CommandProcess>> {
        tracing::debug!(command = %command, "start persistent process");

        let mut child = self
            .build_command(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(command, e))?;

        let missing = |stream: &str| {
            Error::io(std::io::Error::other(format!("exiftool {stream} unavailable")))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        let process = PipedProcess::new(stdin, stdout, stderr, self.charset)
            .with_child(child, self.close_timeout);
        Ok(Box::new(process))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_command_sets_program_and_args() {
        let executor = DefaultExecutor::new();
        let cmd = executor.build_command(&Command::new("exiftool").args(["-ver"]));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "exiftool");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["-ver"]);
    }

    #[test]
    fn from_config_copies_process_options() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExifToolConfig::builder()
            .path("exiftool")
            .working_directory(dir.path())
            .env("LC_ALL", "C")
            .inherit_env(false)
            .charset(Charset::Latin1)
            .close_timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        let executor = DefaultExecutor::from_config(&config);
        assert_eq!(executor.charset, Charset::Latin1);
        assert!(executor.clear_env);
        assert_eq!(executor.close_timeout, Duration::from_secs(1));

        let cmd = executor.build_command(&Command::new("exiftool"));
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_current_dir(), Some(dir.path()));
        let envs: Vec<_> = std_cmd.get_envs().collect();
        assert!(envs.contains(&(
            std::ffi::OsStr::new("LC_ALL"),
            Some(std::ffi::OsStr::new("C"))
        )));
    }

    #[test]
    fn spawn_error_classification() {
        let cmd = Command::new("/nonexistent/exiftool");
        let err = spawn_error(&cmd, std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, Error::ExecutableNotFound { ref path } if path == "/nonexistent/exiftool"));

        let err = spawn_error(&cmd, std::io::Error::from(std::io::ErrorKind::OutOfMemory));
        assert!(matches!(err, Error::ProcessSpawn(_)));
    }

    #[tokio::test]
    async fn missing_executable_is_reported() {
        let executor = DefaultExecutor::new();
        let path = "/nonexistent/libexiftool-test/exiftool";

        let err = executor.execute(&Command::new(path).arg("-ver")).await.unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound { .. }));

        let err = executor
            .start(&Command::new(path).args(crate::process::STAY_OPEN_START))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::ExecutableNotFound { .. }));
    }
}
