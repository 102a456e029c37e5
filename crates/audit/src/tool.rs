//! External audit tool seam

use async_trait::async_trait;
use plaudit_config::AuditConfig;
use plaudit_errors::{AuditError, Error};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured output of one audit tool invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// The external dependency audit tool
///
/// Implementations run inside one plugin's working directory.
#[async_trait]
pub trait AuditTool: Send + Sync {
    /// Program name used in messages
    fn name(&self) -> &str;

    /// Run the audit in JSON output mode
    async fn audit(&self, dir: &Path) -> Result<ToolOutput, Error>;

    /// Generate a lockfile from the manifest alone
    async fn synthesize_lockfile(&self, dir: &Path) -> Result<(), Error>;
}

/// Program plus arguments for one invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string()));
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run to completion inside `dir`, bounded by `limit`
    ///
    /// The child is killed if the deadline passes or the future is dropped.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::SpawnFailed` if the program cannot be started and
    /// `AuditError::Timeout` if it outlives `limit`.
    pub async fn run(&self, dir: &Path, limit: Duration) -> Result<ToolOutput, Error> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| AuditError::SpawnFailed {
            program: self.program.clone(),
            message: e.to_string(),
        })?;

        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| AuditError::Timeout {
                program: self.program.clone(),
                seconds: limit.as_secs(),
            })?
            .map_err(|e| AuditError::SpawnFailed {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Audit tool backed by a real subprocess (`npm` by default)
#[derive(Debug, Clone)]
pub struct CommandAuditTool {
    audit: ToolCommand,
    lockfile: ToolCommand,
    timeout: Duration,
}

impl CommandAuditTool {
    #[must_use]
    pub fn new(audit: ToolCommand, lockfile: ToolCommand, timeout: Duration) -> Self {
        Self {
            audit,
            lockfile,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        let mut audit = ToolCommand::new(&config.program);
        audit.args(&config.audit_args);
        let mut lockfile = ToolCommand::new(&config.program);
        lockfile.args(&config.lockfile_args);
        Self::new(audit, lockfile, Duration::from_secs(config.timeout))
    }
}

#[async_trait]
impl AuditTool for CommandAuditTool {
    fn name(&self) -> &str {
        self.audit.program()
    }

    async fn audit(&self, dir: &Path) -> Result<ToolOutput, Error> {
        // Exit status is ignored: npm exits non-zero whenever it finds something
        self.audit.run(dir, self.timeout).await
    }

    async fn synthesize_lockfile(&self, dir: &Path) -> Result<(), Error> {
        let output = self.lockfile.run(dir, self.timeout).await?;
        match output.status {
            Some(0) => Ok(()),
            status => Err(AuditError::ToolFailed {
                program: self.lockfile.program().to_string(),
                status: status.unwrap_or(-1),
                stderr: output.stderr.trim().to_string(),
            }
            .into()),
        }
    }
}
