//! Azure AD application the multi-cloud API authenticates as

use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;
use crate::cloud::az::{AzureCli, FederatedCredential};
use crate::cloud::runner::DRY_RUN_PLACEHOLDER;

/// Roles granted to the application on the subscription
pub const APPLICATION_ROLES: &[&str] = &[
    "Contributor",
    "User Access Administrator",
    "Key Vault Administrator",
];

/// Handle create-secret
pub fn create(ctx: &Context) -> Result<()> {
    let name = &ctx.settings.azure.application_name;
    let env = ctx.environment();
    let az = AzureCli::new(ctx.runner);

    let account = env.azure_account()?;
    let project = env.project_id()?;
    let project_number = env.project_number(&project)?;

    let app_id = match az.find_application(name)? {
        Some(app_id) => {
            crate::log_info!("Reusing AD application {} ({})", name, app_id);
            app_id
        }
        None => az
            .create_application(name)
            .with_context(|| format!("Failed to create AD application {}", name))?,
    };

    // a dry-run application has no id to look anything up by
    let planned = app_id == DRY_RUN_PLACEHOLDER;

    if planned || az.find_service_principal(&app_id)?.is_none() {
        az.create_service_principal(&app_id)?;
    }

    let scope = format!("/subscriptions/{}", account.id);
    for role in APPLICATION_ROLES {
        az.assign_role(&app_id, role, &scope)
            .with_context(|| format!("Failed to assign role '{}'", role))?;
    }

    let credential = FederatedCredential::for_service_agent(&project_number);
    if !planned && az.has_federated_credential(&app_id, &credential.name)? {
        crate::log_info!("Federated credential {} already present", credential.name);
    } else {
        az.create_federated_credential(&app_id, &credential)
            .context("Failed to create federated credential")?;
    }

    if !ctx.dry_run {
        println!("{} {}", "Application ID:".green(), app_id);
        println!("{} {}", "Tenant ID:".green(), account.tenant_id);
    }
    Ok(())
}

/// Handle delete-secret
pub fn delete(ctx: &Context) -> Result<()> {
    let name = &ctx.settings.azure.application_name;
    let az = AzureCli::new(ctx.runner);

    match az.find_application(name)? {
        Some(app_id) => {
            // removes the service principal and federated credentials with it
            az.delete_application(&app_id)
                .with_context(|| format!("Failed to delete AD application {}", name))?;
            if !ctx.dry_run {
                println!("{} {} ({})", "Deleted application".green(), name, app_id);
            }
        }
        None => crate::log_warn!("AD application {} not found, nothing to delete", name),
    }
    Ok(())
}
