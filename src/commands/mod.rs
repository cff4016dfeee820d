//! Command implementations for azure-anthos CLI

pub mod cluster;
pub mod credentials;
pub mod environment;
pub mod fleet;
pub mod network;
pub mod nodepool;
pub mod operation;
pub mod secret;

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::api::types::Operation;
use crate::api::{MultiCloudClient, Transport};
use crate::cloud::gcloud::GcloudCli;
use crate::cloud::{CommandRunner, Environment};
use crate::config::Settings;
use crate::utils::output::{self, OutputFormat};

/// Everything an operation needs for one invocation
pub struct Context<'a> {
    pub settings: &'a Settings,
    pub runner: &'a dyn CommandRunner,
    pub transport: &'a dyn Transport,
    pub output: OutputFormat,
    pub dry_run: bool,
    /// Shared kubeconfig that get-credentials merges into
    pub kubeconfig: PathBuf,
}

impl<'a> Context<'a> {
    pub fn environment(&self) -> Environment<'a> {
        Environment::new(self.settings, self.runner)
    }

    /// API client for the configured project and region, authenticated with a fresh gcloud token
    pub fn client(&self) -> Result<MultiCloudClient<&'a dyn Transport>> {
        let project = self.environment().project_id()?;
        let token = GcloudCli::new(self.runner).access_token()?;
        Ok(MultiCloudClient::new(
            self.settings.api_endpoint(),
            project,
            self.settings.gcp.region.clone(),
            token,
            self.transport,
        ))
    }

    pub fn ssh_key_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.cluster.ssh_key_dir)
    }
}

const OPERATION_FIELDS: &[&str] = &[
    "name",
    "done",
    "metadata.verb",
    "metadata.target",
    "metadata.createTime",
    "metadata.endTime",
    "error.message",
];

/// Print the long-running operation a mutation started
pub fn print_started_operation(op: &Operation, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return output::print_json(op);
    }

    if op.name.is_empty() {
        // dry run: nothing was sent
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Started operation".green(),
        op.id().bold(),
        op.status_label()
    );
    println!("Track it with: azure-anthos get-operation {}", op.id());
    Ok(())
}

/// Print an operation document
pub fn print_operation(op: &Operation, format: OutputFormat) -> Result<()> {
    let value = serde_json::to_value(op)?;
    output::print_document(&value, OPERATION_FIELDS, format)?;
    if format == OutputFormat::Text {
        println!("{}: {}", "status".bold(), op.status_label());
    }
    Ok(())
}

/// Warn when a list response was truncated; pages beyond the first are not fetched
pub fn warn_if_truncated(next_page_token: &Option<String>) {
    if next_page_token.is_some() {
        crate::log_warn!("More results are available; only the first page is shown");
    }
}
