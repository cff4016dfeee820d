//! Process runner for the external CLIs (az, gcloud, ssh-keygen)

use anyhow::Result;
use std::process::{Command, Stdio};
use thiserror::Error;

use crate::utils::dryrun;

/// Output substituted for mutating commands that were skipped in dry-run mode
pub const DRY_RUN_PLACEHOLDER: &str = "<dry-run>";

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command failed ({status}): {command}\n{stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Seam between the operations and the external tools they drive
pub trait CommandRunner {
    /// Run a read-only command and capture stdout. Always executed, even in dry-run mode.
    fn query(&self, program: &str, args: &[&str]) -> Result<String>;

    /// Run a mutating command with inherited stdio
    fn run(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Run a mutating command and capture stdout (e.g. to read back a created ID)
    fn run_output(&self, program: &str, args: &[&str]) -> Result<String>;
}

/// Render a command line for logs and dry-run output
pub fn describe(program: &str, args: &[&str]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(program);
    words.extend_from_slice(args);
    shell_words::join(words)
}

/// Runs commands with std::process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    pub dry_run: bool,
}

impl SystemRunner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn capture(program: &str, args: &[&str]) -> Result<String> {
        let command = describe(program, args);
        tracing::debug!("exec: {}", command);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RunnerError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(RunnerError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

impl CommandRunner for SystemRunner {
    fn query(&self, program: &str, args: &[&str]) -> Result<String> {
        Self::capture(program, args)
    }

    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let command = describe(program, args);

        dryrun::exec_unless_dry_run(self.dry_run, &command, || {
            tracing::debug!("exec: {}", command);

            let status = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .status()
                .map_err(|source| RunnerError::Spawn {
                    program: program.to_string(),
                    source,
                })?;

            if !status.success() {
                return Err(RunnerError::Failed {
                    command: command.clone(),
                    status: status.to_string(),
                    stderr: String::new(),
                }
                .into());
            }

            Ok(())
        })
    }

    fn run_output(&self, program: &str, args: &[&str]) -> Result<String> {
        dryrun::exec_unless_dry_run_with_default(
            self.dry_run,
            &describe(program, args),
            DRY_RUN_PLACEHOLDER.to_string(),
            || Self::capture(program, args),
        )
    }
}
