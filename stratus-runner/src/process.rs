//! External process execution
//!
//! Every side effect of a deployment goes through an external tool
//! (`terraform`, `docker`, `aws`, `git`). This module describes those
//! invocations as data and runs them:
//! - `CommandSpec` builds a command line, with secret arguments redacted
//!   whenever it is rendered
//! - `CommandRunner` is the seam between the pipeline and the OS
//! - `SystemCommandRunner` spawns real processes

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DeployError, Result};

/// A single command-line argument
#[derive(Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    /// Passed to the process verbatim, rendered as `****`
    Secret(String),
}

impl Arg {
    fn value(&self) -> &str {
        match self {
            Arg::Plain(v) | Arg::Secret(v) => v,
        }
    }

    fn rendered(&self) -> &str {
        match self {
            Arg::Plain(v) => v,
            Arg::Secret(_) => "****",
        }
    }
}

/// Where a command's stdout goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collected and returned in `CommandOutput::stdout`
    Capture,
    /// Streamed to the operator's terminal as it is produced
    Stream,
}

/// Description of an external command
#[derive(Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<Arg>,
    stdin: Option<String>,
    cwd: Option<PathBuf>,
    output: OutputMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            cwd: None,
            output: OutputMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    /// Adds an argument that must never appear in logs or errors
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Secret(arg.into()));
        self
    }

    /// Bytes written to the process's stdin before waiting on it
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Streams stdout to the terminal instead of capturing it
    pub fn streaming(mut self) -> Self {
        self.output = OutputMode::Stream;
        self
    }

    /// Runs this command through `prefix` (e.g. `sudo`)
    pub fn prefixed(mut self, prefix: &str) -> Self {
        let program = std::mem::replace(&mut self.program, prefix.to_string());
        self.args.insert(0, Arg::Plain(program));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument values as passed to the process
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(Arg::value)
    }

    pub fn stdin_data(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output
    }

    /// Command line with secret arguments redacted
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(Arg::rendered))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.display())
            .field("cwd", &self.cwd)
            .field("stdin", &self.stdin.as_ref().map(|_| "****"))
            .field("output", &self.output)
            .finish()
    }
}

/// What a finished command produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands
///
/// An `Err` means the program could not be started (typically: not
/// installed). A command that ran and exited non-zero is `Ok` with a
/// non-zero `exit_code`; callers decide whether that is fatal.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!("Running: {}", spec);

        let mut command = Command::new(spec.program());
        command.args(spec.argv());

        if let Some(dir) = spec.cwd() {
            command.current_dir(dir);
        }

        command.stdin(if spec.stdin_data().is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });
        command.stdout(match spec.output_mode() {
            OutputMode::Capture => Stdio::piped(),
            OutputMode::Stream => Stdio::inherit(),
        });
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| DeployError::Spawn {
            program: spec.program().to_string(),
            source,
        })?;

        if let Some(input) = spec.stdin_data() {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
                // Dropping closes the pipe so the child sees EOF
                drop(stdin);
            }
        }

        let output = child.wait_with_output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code().unwrap_or(-1);

        if !stdout.trim().is_empty() {
            debug!("{} stdout: {}", spec.program(), stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", spec.program(), stderr.trim());
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_redacts_secrets() {
        let spec = CommandSpec::new("aws")
            .args(["secretsmanager", "put-secret-value", "--secret-string"])
            .secret_arg("AIza-very-secret");

        assert_eq!(
            spec.display(),
            "aws secretsmanager put-secret-value --secret-string ****"
        );
        assert!(!format!("{:?}", spec).contains("AIza"));
        assert_eq!(spec.argv().last(), Some("AIza-very-secret"));
    }

    #[test]
    fn test_prefixed_moves_program_into_args() {
        let spec = CommandSpec::new("docker").arg("info").prefixed("sudo");
        assert_eq!(spec.program(), "sudo");
        assert_eq!(spec.display(), "sudo docker info");
    }

    #[tokio::test]
    async fn test_system_runner_reports_missing_program() {
        let spec = CommandSpec::new("stratus-definitely-not-installed").arg("--version");
        let err = SystemCommandRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, DeployError::Spawn { .. }));
    }
}
