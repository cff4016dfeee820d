//! Google Cloud CLI wrapper

use anyhow::{Context, Result, anyhow};
use std::path::Path;

use super::az::tsv;
use super::runner::CommandRunner;

/// Role granting the Connect agent access to a fleet membership
pub const CONNECT_ROLE: &str = "roles/gkehub.connect";

pub struct GcloudCli<'a> {
    runner: &'a dyn CommandRunner,
}

/// Service account used by the Connect agent of one cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectServiceAccount {
    pub id: String,
    pub email: String,
}

impl ConnectServiceAccount {
    pub fn for_cluster(project: &str, cluster: &str) -> Self {
        let id = format!("{}-connect", cluster);
        let email = format!("{}@{}.iam.gserviceaccount.com", id, project);
        Self { id, email }
    }

    pub fn member(&self) -> String {
        format!("serviceAccount:{}", self.email)
    }
}

/// IAM condition restricting the Connect role to a single membership
pub fn membership_condition(project: &str, cluster: &str) -> String {
    format!(
        "expression=resource.name == 'projects/{}/locations/global/memberships/{}',title=bind-{}-connect",
        project, cluster, cluster
    )
}

impl<'a> GcloudCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// `gcloud config get-value` treats unset keys as empty output or `(unset)`
    fn config_value(&self, key: &str) -> Result<Option<String>> {
        let out = self
            .runner
            .query("gcloud", &["config", "get-value", key, "--quiet"])?;
        Ok(tsv(&out).filter(|v| v != "(unset)"))
    }

    pub fn project_id(&self) -> Result<String> {
        self.config_value("project")?.ok_or_else(|| {
            anyhow!(
                "No GCP project configured. Set gcp.project in the config file \
                 or run: gcloud config set project <PROJECT>"
            )
        })
    }

    pub fn account(&self) -> Result<String> {
        self.config_value("account")?.ok_or_else(|| {
            anyhow!("No active gcloud account. Log in with: gcloud auth login")
        })
    }

    pub fn project_number(&self, project: &str) -> Result<String> {
        let out = self
            .runner
            .query(
                "gcloud",
                &[
                    "projects",
                    "describe",
                    project,
                    "--format=value(projectNumber)",
                ],
            )
            .with_context(|| format!("Failed to describe project {}", project))?;
        tsv(&out).ok_or_else(|| anyhow!("Project {} has no project number", project))
    }

    /// Short-lived OAuth token for the multi-cloud API
    pub fn access_token(&self) -> Result<String> {
        let out = self
            .runner
            .query("gcloud", &["auth", "print-access-token"])
            .context("Failed to obtain an access token from gcloud")?;
        tsv(&out).ok_or_else(|| anyhow!("gcloud returned an empty access token"))
    }

    pub fn create_service_account(&self, project: &str, sa: &ConnectServiceAccount) -> Result<()> {
        crate::log_info!("Creating service account {}", sa.email);
        self.runner.run(
            "gcloud",
            &[
                "iam",
                "service-accounts",
                "create",
                &sa.id,
                "--project",
                project,
                "--display-name",
                &format!("Connect agent for {}", sa.id),
            ],
        )
    }

    pub fn delete_service_account(&self, project: &str, sa: &ConnectServiceAccount) -> Result<()> {
        crate::log_info!("Deleting service account {}", sa.email);
        self.runner.run(
            "gcloud",
            &[
                "iam",
                "service-accounts",
                "delete",
                &sa.email,
                "--project",
                project,
                "--quiet",
            ],
        )
    }

    pub fn add_connect_binding(
        &self,
        project: &str,
        sa: &ConnectServiceAccount,
        cluster: &str,
    ) -> Result<()> {
        crate::log_info!("Binding {} to {} for membership {}", CONNECT_ROLE, sa.email, cluster);
        self.runner.run(
            "gcloud",
            &[
                "projects",
                "add-iam-policy-binding",
                project,
                "--member",
                &sa.member(),
                "--role",
                CONNECT_ROLE,
                "--condition",
                &membership_condition(project, cluster),
                "--quiet",
            ],
        )
    }

    pub fn remove_connect_binding(
        &self,
        project: &str,
        sa: &ConnectServiceAccount,
        cluster: &str,
    ) -> Result<()> {
        crate::log_info!("Removing {} binding for {}", CONNECT_ROLE, sa.email);
        self.runner.run(
            "gcloud",
            &[
                "projects",
                "remove-iam-policy-binding",
                project,
                "--member",
                &sa.member(),
                "--role",
                CONNECT_ROLE,
                "--condition",
                &membership_condition(project, cluster),
                "--quiet",
            ],
        )
    }

    pub fn create_key(&self, project: &str, sa: &ConnectServiceAccount, path: &Path) -> Result<()> {
        crate::log_info!("Creating key file {}", path.display());
        let path = path.to_string_lossy();
        self.runner.run(
            "gcloud",
            &[
                "iam",
                "service-accounts",
                "keys",
                "create",
                &path,
                "--iam-account",
                &sa.email,
                "--project",
                project,
            ],
        )
    }

    pub fn register_membership(
        &self,
        project: &str,
        cluster: &str,
        kubeconfig: &Path,
        key_file: &Path,
    ) -> Result<()> {
        crate::log_info!("Registering {} as a fleet membership", cluster);
        let kubeconfig = kubeconfig.to_string_lossy();
        let key_file = key_file.to_string_lossy();
        self.runner.run(
            "gcloud",
            &[
                "container",
                "fleet",
                "memberships",
                "register",
                cluster,
                "--context",
                cluster,
                "--kubeconfig",
                &kubeconfig,
                "--service-account-key-file",
                &key_file,
                "--project",
                project,
            ],
        )
    }

    pub fn unregister_membership(&self, project: &str, cluster: &str, kubeconfig: &Path) -> Result<()> {
        crate::log_info!("Unregistering fleet membership {}", cluster);
        let kubeconfig = kubeconfig.to_string_lossy();
        self.runner.run(
            "gcloud",
            &[
                "container",
                "fleet",
                "memberships",
                "unregister",
                cluster,
                "--context",
                cluster,
                "--kubeconfig",
                &kubeconfig,
                "--project",
                project,
                "--quiet",
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;

    #[test]
    fn test_connect_service_account_naming() {
        let sa = ConnectServiceAccount::for_cluster("my-proj", "demo");
        assert_eq!(sa.id, "demo-connect");
        assert_eq!(sa.email, "demo-connect@my-proj.iam.gserviceaccount.com");
        assert_eq!(
            sa.member(),
            "serviceAccount:demo-connect@my-proj.iam.gserviceaccount.com"
        );
    }

    #[test]
    fn test_membership_condition() {
        assert_eq!(
            membership_condition("p", "demo"),
            "expression=resource.name == 'projects/p/locations/global/memberships/demo',title=bind-demo-connect"
        );
    }

    #[test]
    fn test_unset_project_is_an_error() {
        let runner = RecordingRunner::new().respond("gcloud config get-value project", "(unset)\n");
        let err = GcloudCli::new(&runner).project_id().unwrap_err();
        assert!(err.to_string().contains("No GCP project configured"));
    }

    #[test]
    fn test_project_number() {
        let runner = RecordingRunner::new().respond("gcloud projects describe", "123456789012\n");
        let number = GcloudCli::new(&runner).project_number("p").unwrap();
        assert_eq!(number, "123456789012");
    }

    #[test]
    fn test_access_token_is_trimmed() {
        let runner = RecordingRunner::new().respond("gcloud auth print-access-token", "ya29.token\n");
        assert_eq!(GcloudCli::new(&runner).access_token().unwrap(), "ya29.token");
    }
}
