//! External command execution
//!
//! Commands are always a program plus an argument vector; nothing is ever
//! passed through a shell. Two modes exist:
//! - captured: stdin closed, stdout/stderr collected, used for probes and
//!   non-interactive installers
//! - interactive: standard streams inherited so the child can prompt
//!
//! Neither mode turns a failing child into an error by itself. Callers decide
//! what a failure means, usually through [`CommandOutput::check`].

use std::fmt;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{InstallerError, Result};
use crate::privilege::UserAccount;

/// A fully specified command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub run_as: Option<UserAccount>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            run_as: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Run with the account's uid/gid and login environment
    pub fn run_as(mut self, account: UserAccount) -> Self {
        self.run_as = Some(account);
        self
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        if let Some(account) = &self.run_as {
            cmd.uid(account.uid)
                .gid(account.gid)
                .env("HOME", &account.home)
                .env("USER", &account.name)
                .env("LOGNAME", &account.name);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

const NOT_STARTED: &str = "not started";

/// Result of running a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn succeeded() -> Self {
        Self {
            success: true,
            status: "exit status: 0".to_string(),
            ..Self::default()
        }
    }

    pub fn failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            status: status.into(),
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// Output for a program that could not be started at all
    pub fn not_started(program: &str, reason: impl fmt::Display) -> Self {
        Self::failed(NOT_STARTED, format!("{program}: {reason}"))
    }

    /// Turn a failed run into [`InstallerError::CommandFailed`], or
    /// [`InstallerError::CommandSpawnFailed`] when nothing ran
    pub fn check(self, spec: &CommandSpec) -> Result<Self> {
        if self.success {
            Ok(self)
        } else if self.status == NOT_STARTED {
            Err(InstallerError::CommandSpawnFailed {
                program: spec.program.clone(),
                reason: self.stderr.trim().to_string(),
            })
        } else {
            Err(InstallerError::CommandFailed {
                command: spec.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Process execution capability
pub trait CommandRunner {
    /// Run without a terminal, collecting output
    fn run_captured(&self, spec: &CommandSpec) -> CommandOutput;

    /// Run attached to the terminal; nothing is captured
    fn run_interactive(&self, spec: &CommandSpec) -> CommandOutput;
}

/// Runs real processes
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run_captured(&self, spec: &CommandSpec) -> CommandOutput {
        tracing::debug!("running: {spec}");
        match spec
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
        {
            Ok(output) => CommandOutput {
                success: output.status.success(),
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => CommandOutput::not_started(&spec.program, e),
        }
    }

    fn run_interactive(&self, spec: &CommandSpec) -> CommandOutput {
        tracing::debug!("running interactively: {spec}");
        match spec.to_command().status() {
            Ok(status) => CommandOutput {
                success: status.success(),
                status: status.to_string(),
                ..CommandOutput::default()
            },
            Err(e) => CommandOutput::not_started(&spec.program, e),
        }
    }
}
