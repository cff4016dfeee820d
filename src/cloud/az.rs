//! Azure CLI wrapper

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::runner::CommandRunner;

/// Fields of `az account show` we rely on
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureAccount {
    /// Subscription ID
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
}

/// Body of `az ad app federated-credential create --parameters`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FederatedCredential {
    pub name: String,
    pub issuer: String,
    pub subject: String,
    pub audiences: Vec<String>,
    pub description: String,
}

impl FederatedCredential {
    /// Trust the multi-cloud service agent of the given project
    pub fn for_service_agent(project_number: &str) -> Self {
        Self {
            name: format!("anthos-{}", project_number),
            issuer: "https://accounts.google.com".to_string(),
            subject: format!(
                "service-{}@gcp-sa-gkemulticloud.iam.gserviceaccount.com",
                project_number
            ),
            audiences: vec!["api://AzureADTokenExchange".to_string()],
            description: "Anthos Multi-Cloud API workload identity federation".to_string(),
        }
    }
}

/// Treat empty `-o tsv` output as "no result"
pub fn tsv(output: &str) -> Option<String> {
    let value = output.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub struct AzureCli<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> AzureCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn query_required(&self, args: &[&str], what: &str) -> Result<String> {
        let out = self.runner.query("az", args)?;
        tsv(&out).ok_or_else(|| anyhow!("Azure CLI returned no {}", what))
    }

    /// Active subscription and tenant
    pub fn account(&self) -> Result<AzureAccount> {
        let out = self.runner.query("az", &["account", "show", "-o", "json"])?;
        serde_json::from_str(&out).context("Failed to parse `az account show` output")
    }

    pub fn resource_group_id(&self, name: &str) -> Result<String> {
        self.query_required(
            &["group", "show", "--name", name, "--query", "id", "-o", "tsv"],
            "resource group ID",
        )
        .with_context(|| format!("Failed to look up resource group {}", name))
    }

    pub fn vnet_id(&self, resource_group: &str, vnet: &str) -> Result<String> {
        self.query_required(
            &[
                "network",
                "vnet",
                "show",
                "--resource-group",
                resource_group,
                "--name",
                vnet,
                "--query",
                "id",
                "-o",
                "tsv",
            ],
            "virtual network ID",
        )
        .with_context(|| format!("Failed to look up virtual network {}", vnet))
    }

    pub fn subnet_id(&self, resource_group: &str, vnet: &str, subnet: &str) -> Result<String> {
        self.query_required(
            &[
                "network",
                "vnet",
                "subnet",
                "show",
                "--resource-group",
                resource_group,
                "--vnet-name",
                vnet,
                "--name",
                subnet,
                "--query",
                "id",
                "-o",
                "tsv",
            ],
            "subnet ID",
        )
        .with_context(|| format!("Failed to look up subnet {}/{}", vnet, subnet))
    }

    pub fn create_resource_group(&self, name: &str, location: &str) -> Result<()> {
        crate::log_info!("Creating resource group {} in {}", name, location);
        self.runner.run(
            "az",
            &["group", "create", "--name", name, "--location", location, "-o", "none"],
        )
    }

    pub fn delete_resource_group(&self, name: &str) -> Result<()> {
        crate::log_info!("Deleting resource group {}", name);
        self.runner
            .run("az", &["group", "delete", "--name", name, "--yes"])
    }

    pub fn create_vnet(
        &self,
        resource_group: &str,
        vnet: &str,
        location: &str,
        address_prefix: &str,
        subnet: &str,
        subnet_prefix: &str,
    ) -> Result<()> {
        crate::log_info!("Creating virtual network {} with subnet {}", vnet, subnet);
        self.runner.run(
            "az",
            &[
                "network",
                "vnet",
                "create",
                "--resource-group",
                resource_group,
                "--name",
                vnet,
                "--location",
                location,
                "--address-prefixes",
                address_prefix,
                "--subnet-name",
                subnet,
                "--subnet-prefixes",
                subnet_prefix,
                "-o",
                "none",
            ],
        )
    }

    /// Outbound internet access for the subnet: public IP, NAT gateway, subnet association
    pub fn create_nat_gateway(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
        location: &str,
    ) -> Result<()> {
        let ip_name = format!("{}-nat-ip", vnet);
        let nat_name = format!("{}-nat", vnet);

        crate::log_info!("Creating NAT gateway {}", nat_name);
        self.runner.run(
            "az",
            &[
                "network",
                "public-ip",
                "create",
                "--resource-group",
                resource_group,
                "--name",
                &ip_name,
                "--location",
                location,
                "--sku",
                "Standard",
                "--allocation-method",
                "Static",
                "-o",
                "none",
            ],
        )?;
        self.runner.run(
            "az",
            &[
                "network",
                "nat",
                "gateway",
                "create",
                "--resource-group",
                resource_group,
                "--name",
                &nat_name,
                "--location",
                location,
                "--public-ip-addresses",
                &ip_name,
                "-o",
                "none",
            ],
        )?;
        self.runner.run(
            "az",
            &[
                "network",
                "vnet",
                "subnet",
                "update",
                "--resource-group",
                resource_group,
                "--vnet-name",
                vnet,
                "--name",
                subnet,
                "--nat-gateway",
                &nat_name,
                "-o",
                "none",
            ],
        )
    }

    /// Application ID of the AD application with this display name, if any
    pub fn find_application(&self, display_name: &str) -> Result<Option<String>> {
        let out = self.runner.query(
            "az",
            &[
                "ad",
                "app",
                "list",
                "--display-name",
                display_name,
                "--query",
                "[0].appId",
                "-o",
                "tsv",
            ],
        )?;
        Ok(tsv(&out))
    }

    pub fn create_application(&self, display_name: &str) -> Result<String> {
        crate::log_info!("Creating AD application {}", display_name);
        let out = self.runner.run_output(
            "az",
            &[
                "ad",
                "app",
                "create",
                "--display-name",
                display_name,
                "--query",
                "appId",
                "-o",
                "tsv",
            ],
        )?;
        tsv(&out).ok_or_else(|| anyhow!("`az ad app create` returned no application ID"))
    }

    pub fn delete_application(&self, app_id: &str) -> Result<()> {
        crate::log_info!("Deleting AD application {}", app_id);
        self.runner.run("az", &["ad", "app", "delete", "--id", app_id])
    }

    /// Object ID of the service principal for an application, if any
    pub fn find_service_principal(&self, app_id: &str) -> Result<Option<String>> {
        let filter = format!("appId eq '{}'", app_id);
        let out = self.runner.query(
            "az",
            &[
                "ad", "sp", "list", "--filter", &filter, "--query", "[0].id", "-o", "tsv",
            ],
        )?;
        Ok(tsv(&out))
    }

    pub fn create_service_principal(&self, app_id: &str) -> Result<()> {
        crate::log_info!("Creating service principal for {}", app_id);
        self.runner
            .run("az", &["ad", "sp", "create", "--id", app_id, "-o", "none"])
    }

    pub fn assign_role(&self, app_id: &str, role: &str, scope: &str) -> Result<()> {
        crate::log_info!("Assigning role '{}' on {}", role, scope);
        self.runner.run(
            "az",
            &[
                "role",
                "assignment",
                "create",
                "--assignee",
                app_id,
                "--role",
                role,
                "--scope",
                scope,
                "-o",
                "none",
            ],
        )
    }

    /// Whether the application already trusts a federated credential with this name
    pub fn has_federated_credential(&self, app_id: &str, name: &str) -> Result<bool> {
        let query = format!("[?name=='{}'].name", name);
        let out = self.runner.query(
            "az",
            &[
                "ad",
                "app",
                "federated-credential",
                "list",
                "--id",
                app_id,
                "--query",
                &query,
                "-o",
                "tsv",
            ],
        )?;
        Ok(tsv(&out).is_some())
    }

    pub fn create_federated_credential(
        &self,
        app_id: &str,
        credential: &FederatedCredential,
    ) -> Result<()> {
        crate::log_info!("Creating federated credential {}", credential.name);
        let parameters = serde_json::to_string(credential)?;
        self.runner.run(
            "az",
            &[
                "ad",
                "app",
                "federated-credential",
                "create",
                "--id",
                app_id,
                "--parameters",
                &parameters,
                "-o",
                "none",
            ],
        )
    }
}
