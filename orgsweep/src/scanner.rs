use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use crate::config::{Config, Token};

/// Subcommand selecting the scanner's GitHub source.
pub const PLATFORM_SUBCOMMAND: &str = "github";

/// Runs the scanner executable.
#[async_trait]
pub trait ScannerRunner: Send + Sync {
    /// Run with `args`, sending stdout and stderr to `output`. Returns the
    /// exit code, or `None` if the process was terminated by a signal.
    async fn run(&self, args: &[String], output: File) -> io::Result<Option<i32>>;
}

/// Spawns the configured executable as a child process.
pub struct ProcessRunner {
    program: PathBuf,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ScannerRunner for ProcessRunner {
    async fn run(&self, args: &[String], output: File) -> io::Result<Option<i32>> {
        let stderr = output.try_clone()?;
        let status = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::from(stderr))
            .status()
            .await?;
        Ok(status.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Succeeded,
    /// Exited non-zero; `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// The executable could not be started.
    LaunchFailed { reason: String },
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Succeeded)
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::Succeeded => write!(f, "succeeded"),
            ScanOutcome::Failed { code: Some(code) } => write!(f, "exited with code {code}"),
            ScanOutcome::Failed { code: None } => write!(f, "terminated by signal"),
            ScanOutcome::LaunchFailed { reason } => write!(f, "failed to launch: {reason}"),
        }
    }
}

/// Builds scanner invocations for one server and token.
pub struct Scanner {
    runner: Arc<dyn ScannerRunner>,
    token: Token,
    endpoint: String,
}

impl Scanner {
    pub fn new(config: &Config, runner: Arc<dyn ScannerRunner>) -> Self {
        Self {
            runner,
            token: config.token.clone(),
            endpoint: config.base_url.clone(),
        }
    }

    pub fn args(&self, org: &str) -> Vec<String> {
        vec![
            PLATFORM_SUBCOMMAND.to_string(),
            "--token".to_string(),
            self.token.expose_secret().to_string(),
            "--org".to_string(),
            org.to_string(),
            "--no-update".to_string(),
            "--endpoint".to_string(),
            self.endpoint.clone(),
        ]
    }

    /// Scan `org`, overwriting `log_path` with the scanner's combined output.
    ///
    /// Only a failure to create the log file is an error; everything the
    /// scanner does is reported through [`ScanOutcome`].
    #[instrument(skip(self, log_path), fields(log = %log_path.display()))]
    pub async fn scan(&self, org: &str, log_path: &Path) -> Result<ScanOutcome> {
        let log = File::create(log_path)
            .with_context(|| format!("failed to create {}", log_path.display()))?;

        let args = self.args(org);
        debug!(command = %redact(&args, self.token.expose_secret()), "running scanner");

        let outcome = match self.runner.run(&args, log).await {
            Ok(Some(0)) => ScanOutcome::Succeeded,
            Ok(code) => ScanOutcome::Failed { code },
            Err(e) => ScanOutcome::LaunchFailed {
                reason: e.to_string(),
            },
        };
        Ok(outcome)
    }
}

fn redact(args: &[String], secret: &str) -> String {
    args.iter()
        .map(|a| if a == secret { "***" } else { a.as_str() })
        .collect::<Vec<_>>()
        .join(" ")
}
