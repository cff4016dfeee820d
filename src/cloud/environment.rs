//! Identifiers derived from the Azure and Google Cloud CLIs.
//!
//! Nothing here is cached: every lookup queries the CLIs again, and each
//! operation asks only for the identifiers it needs.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use super::az::{AzureAccount, AzureCli};
use super::gcloud::GcloudCli;
use super::runner::CommandRunner;
use crate::config::Settings;

pub struct Environment<'a> {
    settings: &'a Settings,
    az: AzureCli<'a>,
    gcloud: GcloudCli<'a>,
}

/// Everything `get-env` prints. Lookups that failed are left empty.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReport {
    pub api_endpoint: String,
    pub gcp_region: String,
    pub azure_region: String,
    pub project_id: Option<String>,
    pub project_number: Option<String>,
    pub gcloud_account: Option<String>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub cluster_resource_group_id: Option<String>,
    pub virtual_network_id: Option<String>,
    pub subnet_id: Option<String>,
    pub application_id: Option<String>,
}

/// Keep the value, log the failure
fn soft<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            crate::log_warn!("Could not resolve {}: {:#}", what, e);
            None
        }
    }
}

impl<'a> Environment<'a> {
    pub fn new(settings: &'a Settings, runner: &'a dyn CommandRunner) -> Self {
        Self {
            settings,
            az: AzureCli::new(runner),
            gcloud: GcloudCli::new(runner),
        }
    }

    pub fn project_id(&self) -> Result<String> {
        match &self.settings.gcp.project {
            Some(project) => Ok(project.clone()),
            None => self.gcloud.project_id(),
        }
    }

    pub fn project_number(&self, project: &str) -> Result<String> {
        self.gcloud.project_number(project)
    }

    pub fn gcloud_account(&self) -> Result<String> {
        self.gcloud.account()
    }

    pub fn azure_account(&self) -> Result<AzureAccount> {
        self.az.account().context("Failed to read the active Azure subscription")
    }

    pub fn cluster_resource_group_id(&self) -> Result<String> {
        self.az
            .resource_group_id(&self.settings.azure.cluster_resource_group)
    }

    pub fn virtual_network_id(&self) -> Result<String> {
        let azure = &self.settings.azure;
        self.az.vnet_id(&azure.vnet_resource_group, &azure.vnet_name)
    }

    pub fn subnet_id(&self) -> Result<String> {
        let azure = &self.settings.azure;
        self.az
            .subnet_id(&azure.vnet_resource_group, &azure.vnet_name, &azure.subnet_name)
    }

    /// Application ID of the configured AD application; it must already exist
    pub fn application_id(&self) -> Result<String> {
        let name = &self.settings.azure.application_name;
        self.az.find_application(name)?.ok_or_else(|| {
            anyhow!(
                "AD application '{}' not found. Create it with: azure-anthos create-secret",
                name
            )
        })
    }

    /// Resolve everything, tolerating individual failures
    pub fn report(&self) -> EnvironmentReport {
        let project_id = soft("project ID", self.project_id());
        let project_number = project_id
            .as_deref()
            .and_then(|p| soft("project number", self.project_number(p)));
        let account = soft("Azure subscription", self.azure_account());

        EnvironmentReport {
            api_endpoint: self.settings.api_endpoint(),
            gcp_region: self.settings.gcp.region.clone(),
            azure_region: self.settings.azure.region.clone(),
            project_id,
            project_number,
            gcloud_account: soft("gcloud account", self.gcloud_account()),
            subscription_id: account.as_ref().map(|a| a.id.clone()),
            tenant_id: account.map(|a| a.tenant_id),
            cluster_resource_group_id: soft(
                "cluster resource group",
                self.cluster_resource_group_id(),
            ),
            virtual_network_id: soft("virtual network", self.virtual_network_id()),
            subnet_id: soft("subnet", self.subnet_id()),
            application_id: soft("AD application", self.application_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;

    #[test]
    fn test_project_from_settings_skips_gcloud() {
        let mut settings = Settings::default();
        settings.gcp.project = Some("configured".to_string());
        let runner = RecordingRunner::new();

        let env = Environment::new(&settings, &runner);
        assert_eq!(env.project_id().unwrap(), "configured");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_missing_application_points_to_create_secret() {
        let settings = Settings::default();
        let runner = RecordingRunner::new();
        let err = Environment::new(&settings, &runner)
            .application_id()
            .unwrap_err();
        assert!(err.to_string().contains("create-secret"));
    }

    #[test]
    fn test_report_tolerates_failures() {
        let settings = Settings::default();
        let runner = RecordingRunner::new()
            .respond("gcloud config get-value project", "my-proj\n")
            .respond("gcloud projects describe", "42\n")
            .respond(
                "az account show",
                r#"{"id": "sub", "tenantId": "tenant"}"#,
            )
            .fail("az network vnet show");

        let report = Environment::new(&settings, &runner).report();
        assert_eq!(report.project_id.as_deref(), Some("my-proj"));
        assert_eq!(report.project_number.as_deref(), Some("42"));
        assert_eq!(report.subscription_id.as_deref(), Some("sub"));
        assert_eq!(report.tenant_id.as_deref(), Some("tenant"));
        assert!(report.virtual_network_id.is_none());
        assert_eq!(report.gcp_region, "us-east4");
    }
}
