//! Azure network resources shared by every cluster

use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;
use crate::cloud::az::AzureCli;

/// Handle create-network
pub fn create(ctx: &Context) -> Result<()> {
    let azure = &ctx.settings.azure;
    let az = AzureCli::new(ctx.runner);

    crate::log_info!(
        "Creating network {} in resource group {}",
        azure.vnet_name,
        azure.vnet_resource_group
    );

    az.create_resource_group(&azure.vnet_resource_group, &azure.region)?;
    az.create_vnet(
        &azure.vnet_resource_group,
        &azure.vnet_name,
        &azure.region,
        &azure.vnet_address_prefix,
        &azure.subnet_name,
        &azure.subnet_address_prefix,
    )
    .with_context(|| format!("Failed to create virtual network {}", azure.vnet_name))?;
    az.create_nat_gateway(
        &azure.vnet_resource_group,
        &azure.vnet_name,
        &azure.subnet_name,
        &azure.region,
    )
    .context("Failed to create NAT gateway")?;
    az.create_resource_group(&azure.cluster_resource_group, &azure.region)?;

    if !ctx.dry_run {
        println!(
            "{} {}/{} ({}), cluster resource group {}",
            "Network ready:".green(),
            azure.vnet_name,
            azure.subnet_name,
            azure.subnet_address_prefix,
            azure.cluster_resource_group
        );
    }
    Ok(())
}

/// Handle delete-network
pub fn delete(ctx: &Context) -> Result<()> {
    let azure = &ctx.settings.azure;
    let az = AzureCli::new(ctx.runner);

    az.delete_resource_group(&azure.cluster_resource_group)
        .with_context(|| {
            format!(
                "Failed to delete resource group {}",
                azure.cluster_resource_group
            )
        })?;
    az.delete_resource_group(&azure.vnet_resource_group)
        .with_context(|| {
            format!("Failed to delete resource group {}", azure.vnet_resource_group)
        })?;

    if !ctx.dry_run {
        println!(
            "{} {} and {}",
            "Deleted resource groups".green(),
            azure.cluster_resource_group,
            azure.vnet_resource_group
        );
    }
    Ok(())
}
