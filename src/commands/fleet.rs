//! Fleet registration through the Connect agent

use anyhow::Result;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use super::Context;
use crate::cloud::gcloud::{ConnectServiceAccount, GcloudCli};
use crate::k8s::kubeconfig::Kubeconfig;
use crate::utils::errors::AnthosError;

/// `<ssh key dir>/<cluster>-connect-key.json`
pub fn key_file(ctx: &Context, cluster: &str) -> PathBuf {
    ctx.ssh_key_dir()
        .join(format!("{}-connect-key.json", cluster))
}

/// Handle register
pub fn register(ctx: &Context, cluster: &str) -> Result<()> {
    if !Kubeconfig::load(&ctx.kubeconfig)?.has_context(cluster) {
        return Err(AnthosError::context_not_found(cluster).into());
    }

    let project = ctx.environment().project_id()?;
    let gcloud = GcloudCli::new(ctx.runner);
    let sa = ConnectServiceAccount::for_cluster(&project, cluster);
    let key = key_file(ctx, cluster);

    gcloud.create_service_account(&project, &sa)?;
    gcloud.add_connect_binding(&project, &sa, cluster)?;
    gcloud.create_key(&project, &sa, &key)?;
    gcloud.register_membership(&project, cluster, &ctx.kubeconfig, &key)?;

    if !ctx.dry_run {
        println!(
            "{} {} in project {}",
            "Registered membership".green(),
            cluster.bold(),
            project
        );
    }
    Ok(())
}

/// Handle unregister. Every step runs even when an earlier one fails.
pub fn unregister(ctx: &Context, cluster: &str) -> Result<()> {
    let project = ctx.environment().project_id()?;
    let gcloud = GcloudCli::new(ctx.runner);
    let sa = ConnectServiceAccount::for_cluster(&project, cluster);
    let key = key_file(ctx, cluster);

    let results = [
        (
            "unregister membership",
            gcloud.unregister_membership(&project, cluster, &ctx.kubeconfig),
        ),
        (
            "remove IAM binding",
            gcloud.remove_connect_binding(&project, &sa, cluster),
        ),
        (
            "delete service account",
            gcloud.delete_service_account(&project, &sa),
        ),
    ];

    let mut failures = 0;
    for (what, result) in results {
        if let Err(e) = result {
            crate::log_warn!("Failed to {}: {:#}", what, e);
            failures += 1;
        }
    }

    if key.exists() {
        if ctx.dry_run {
            crate::utils::dryrun::log_action(&format!("remove {}", key.display()));
        } else if let Err(e) = fs::remove_file(&key) {
            crate::log_warn!("Failed to remove {}: {}", key.display(), e);
            failures += 1;
        }
    }

    if !ctx.dry_run {
        if failures == 0 {
            println!("{} {}", "Unregistered".green(), cluster.bold());
        } else {
            println!(
                "{} {} ({} step(s) failed, see warnings)",
                "Unregistered".yellow(),
                cluster.bold(),
                failures
            );
        }
    }
    Ok(())
}
