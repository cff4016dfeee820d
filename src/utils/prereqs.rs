//! External tools the CLI drives, and where to get them

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("'{name}' is not on PATH (install: {hint})")]
    NotFound { name: String, hint: String },
}

/// A tool that must be installed for some commands to work
pub trait Prerequisite {
    fn name(&self) -> &str;

    /// Resolve the executable on PATH
    fn locate(&self) -> Result<PathBuf, PrereqError>;

    fn install_hint(&self) -> &str;
}

/// Executable looked up with `which`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    pub name: &'static str,
    pub hint: &'static str,
}

impl Tool {
    pub const AZ: Tool = Tool {
        name: "az",
        hint: "https://learn.microsoft.com/cli/azure/install-azure-cli",
    };
    pub const GCLOUD: Tool = Tool {
        name: "gcloud",
        hint: "https://cloud.google.com/sdk/docs/install",
    };
    pub const SSH_KEYGEN: Tool = Tool {
        name: "ssh-keygen",
        hint: "your OS package manager (openssh-client)",
    };

    /// Every tool a full create/register cycle needs
    pub const ALL: [Tool; 3] = [Tool::AZ, Tool::GCLOUD, Tool::SSH_KEYGEN];
}

impl Prerequisite for Tool {
    fn name(&self) -> &str {
        self.name
    }

    fn locate(&self) -> Result<PathBuf, PrereqError> {
        which::which(self.name).map_err(|_| PrereqError::NotFound {
            name: self.name.to_string(),
            hint: self.hint.to_string(),
        })
    }

    fn install_hint(&self) -> &str {
        self.hint
    }
}

/// Installation hint for a program the runner failed to spawn
pub fn install_hint(program: &str) -> &'static str {
    Tool::ALL
        .iter()
        .find(|tool| tool.name == program)
        .map(|tool| tool.hint)
        .unwrap_or("see the tool's documentation")
}

/// Outcome of checking a set of prerequisites
#[derive(Debug, Default)]
pub struct PrereqReport {
    /// Tool name and resolved path
    pub found: Vec<(String, PathBuf)>,
    /// Tool name and install hint
    pub missing: Vec<(String, String)>,
}

impl PrereqReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn check_prerequisites(prereqs: &[&dyn Prerequisite]) -> PrereqReport {
    let mut report = PrereqReport::default();

    for prereq in prereqs {
        match prereq.locate() {
            Ok(path) => {
                tracing::debug!("{} found at {}", prereq.name(), path.display());
                report.found.push((prereq.name().to_string(), path));
            }
            Err(PrereqError::NotFound { name, hint }) => report.missing.push((name, hint)),
        }
    }

    report
}
