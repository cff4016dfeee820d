//! Cluster command implementations

use anyhow::{Context as _, Result};
use std::collections::BTreeMap;

use super::{Context, print_started_operation, warn_if_truncated};
use crate::api::types::{
    AzureAuthorization, AzureCluster, AzureClusterNetworking, AzureClusterUser,
    AzureControlPlane, AzureServicesAuthentication, AzureSshConfig, Fleet,
};
use crate::cloud::ssh;
use crate::config::Settings;
use crate::utils::output;

const CLUSTER_FIELDS: &[&str] = &[
    "name",
    "state",
    "azureRegion",
    "endpoint",
    "controlPlane.version",
    "controlPlane.vmSize",
    "reconciling",
    "createTime",
    "fleet.membership",
];

const CLUSTER_LIST_FIELDS: &[&str] = &["name", "state", "controlPlane.version", "endpoint"];

/// Identifiers resolved from the Azure and Google CLIs for a new cluster
#[derive(Debug, Clone, Default)]
pub struct ClusterInputs {
    /// Full resource name, `projects/<p>/locations/<l>/azureClusters/<name>`
    pub resource_name: String,
    pub tenant_id: String,
    pub application_id: String,
    pub resource_group_id: String,
    pub virtual_network_id: String,
    pub subnet_id: String,
    pub authorized_key: String,
    pub admin_users: Vec<String>,
}

/// Assemble the create-cluster request body
pub fn build_cluster(settings: &Settings, inputs: ClusterInputs) -> AzureCluster {
    let cluster = &settings.cluster;
    let short_name = output::short_name(&inputs.resource_name).to_string();

    AzureCluster {
        name: inputs.resource_name,
        description: Some(format!("Anthos cluster {} on Azure", short_name)),
        azure_region: settings.azure.region.clone(),
        resource_group_id: inputs.resource_group_id,
        azure_services_authentication: Some(AzureServicesAuthentication {
            tenant_id: inputs.tenant_id,
            application_id: inputs.application_id,
        }),
        networking: AzureClusterNetworking {
            virtual_network_id: inputs.virtual_network_id,
            pod_address_cidr_blocks: vec![cluster.pod_address_cidr.clone()],
            service_address_cidr_blocks: vec![cluster.service_address_cidr.clone()],
            service_load_balancer_subnet_id: None,
        },
        control_plane: AzureControlPlane {
            version: cluster.version.clone(),
            subnet_id: Some(inputs.subnet_id),
            vm_size: Some(cluster.control_plane_vm_size.clone()),
            ssh_config: AzureSshConfig {
                authorized_key: inputs.authorized_key,
            },
            root_volume: None,
            main_volume: None,
            tags: BTreeMap::from([("cluster".to_string(), short_name)]),
        },
        authorization: AzureAuthorization {
            admin_users: inputs
                .admin_users
                .into_iter()
                .map(|username| AzureClusterUser { username })
                .collect(),
        },
        fleet: cluster.fleet_project.as_ref().map(|project| Fleet {
            project: format!("projects/{}", project),
            membership: None,
        }),
        ..Default::default()
    }
}

/// Handle create-cluster
pub fn create(ctx: &Context, name: &str) -> Result<()> {
    crate::log_info!("Creating Azure cluster: {}", name);

    let key_pair = ssh::ensure_key_pair(ctx.runner, &ctx.ssh_key_dir(), name)?;
    let authorized_key = ssh::authorized_key_or_placeholder(&key_pair, ctx.dry_run)?;

    let env = ctx.environment();
    let account = env.azure_account()?;
    let admin_users = if ctx.settings.cluster.admin_users.is_empty() {
        vec![env.gcloud_account()?]
    } else {
        ctx.settings.cluster.admin_users.clone()
    };

    let client = ctx.client()?;
    let inputs = ClusterInputs {
        resource_name: client.cluster_name(name),
        tenant_id: account.tenant_id,
        application_id: env.application_id()?,
        resource_group_id: env.cluster_resource_group_id()?,
        virtual_network_id: env.virtual_network_id()?,
        subnet_id: env.subnet_id()?,
        authorized_key,
        admin_users,
    };

    let request = build_cluster(ctx.settings, inputs);
    let op = client
        .create_cluster(name, &request)
        .with_context(|| format!("Failed to create cluster {}", name))?;

    print_started_operation(&op, ctx.output)
}

/// Handle get-cluster
pub fn get(ctx: &Context, name: &str) -> Result<()> {
    let cluster = ctx
        .client()?
        .get_cluster(name)
        .with_context(|| format!("Failed to get cluster {}", name))?;
    let value = serde_json::to_value(&cluster)?;
    output::print_document(&value, CLUSTER_FIELDS, ctx.output)
}

/// Handle list-clusters
pub fn list(ctx: &Context) -> Result<()> {
    let response = ctx
        .client()?
        .list_clusters()
        .context("Failed to list clusters")?;
    warn_if_truncated(&response.next_page_token);

    let items = response
        .azure_clusters
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    output::print_list(&items, CLUSTER_LIST_FIELDS, ctx.output)
}

/// Handle delete-cluster
pub fn delete(ctx: &Context, name: &str) -> Result<()> {
    crate::log_info!("Deleting Azure cluster: {}", name);

    let op = ctx
        .client()?
        .delete_cluster(name)
        .with_context(|| format!("Failed to delete cluster {}", name))?;

    print_started_operation(&op, ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, cloud_runner, context, settings_in};
    use reqwest::Method;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_create_posts_one_request_with_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new().reply(json!({
            "name": "projects/my-proj/locations/us-east4/operations/op-1"
        }));
        let ctx = context(&settings, &runner, &transport, dir.path());

        // ssh-keygen is faked, so provide the public key it would have written
        fs::write(dir.path().join("demo-ssh-key.pub"), "ssh-rsa AAAAB3 anthos-demo\n").unwrap();

        create(&ctx, "demo").unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(
            requests[0].url,
            "https://us-east4-gkemulticloud.googleapis.com/v1/projects/my-proj/locations/us-east4/azureClusters?azureClusterId=demo"
        );

        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(
            body["name"],
            "projects/my-proj/locations/us-east4/azureClusters/demo"
        );
        assert_eq!(body["azureRegion"], "eastus");
        assert_eq!(
            body["resourceGroupId"],
            "/subscriptions/sub-1/resourceGroups/anthos-cluster-rg"
        );
        assert_eq!(body["azureServicesAuthentication"]["tenantId"], "tenant-1");
        assert_eq!(body["azureServicesAuthentication"]["applicationId"], "app-1");
        assert!(
            body["networking"]["virtualNetworkId"]
                .as_str()
                .unwrap()
                .ends_with("/virtualNetworks/anthos-vnet")
        );
        assert!(
            body["controlPlane"]["subnetId"]
                .as_str()
                .unwrap()
                .ends_with("/subnets/default")
        );
        assert_eq!(body["controlPlane"]["vmSize"], "Standard_DS2_v2");
        assert_eq!(
            body["controlPlane"]["sshConfig"]["authorizedKey"],
            "ssh-rsa AAAAB3 anthos-demo"
        );
        assert_eq!(
            body["authorization"]["adminUsers"][0]["username"],
            "admin@example.com"
        );
        assert!(body.get("fleet").is_none());
        assert!(body.get("state").is_none());
    }

    #[test]
    fn test_create_generates_ssh_key_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new();
        let ctx = context(&settings, &runner, &transport, dir.path());

        fs::write(dir.path().join("demo-ssh-key.pub"), "ssh-rsa AAAA\n").unwrap();
        create(&ctx, "demo").unwrap();
        let keygen_calls = |r: &crate::testing::RecordingRunner| {
            r.mutations()
                .iter()
                .filter(|c| c.starts_with("ssh-keygen"))
                .count()
        };
        assert_eq!(keygen_calls(&runner), 1);

        // the private key now exists
        fs::write(dir.path().join("demo-ssh-key"), "private").unwrap();
        create(&ctx, "demo").unwrap();
        assert_eq!(keygen_calls(&runner), 1);
    }

    #[test]
    fn test_create_fails_fast_without_subnet() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner().fail("az network vnet subnet show");
        let transport = FakeTransport::new();
        let ctx = context(&settings, &runner, &transport, dir.path());
        fs::write(dir.path().join("demo-ssh-key.pub"), "ssh-rsa AAAA\n").unwrap();

        assert!(create(&ctx, "demo").is_err());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_build_cluster_with_fleet_and_admins() {
        let mut settings = Settings::default();
        settings.cluster.fleet_project = Some("fleet-host".to_string());
        let cluster = build_cluster(
            &settings,
            ClusterInputs {
                resource_name: "projects/p/locations/l/azureClusters/demo".to_string(),
                admin_users: vec!["a@example.com".to_string(), "b@example.com".to_string()],
                ..Default::default()
            },
        );

        assert_eq!(cluster.fleet.unwrap().project, "projects/fleet-host");
        assert_eq!(cluster.authorization.admin_users.len(), 2);
        assert_eq!(cluster.control_plane.tags.get("cluster").unwrap(), "demo");
        assert_eq!(
            cluster.networking.pod_address_cidr_blocks,
            vec!["10.200.0.0/16".to_string()]
        );
    }

    #[test]
    fn test_get_and_delete_are_single_requests() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new()
            .reply(json!({"name": "projects/my-proj/locations/us-east4/azureClusters/demo", "state": "RUNNING"}))
            .reply(json!({"name": "projects/my-proj/locations/us-east4/operations/op-9"}));
        let ctx = context(&settings, &runner, &transport, dir.path());

        get(&ctx, "demo").unwrap();
        delete(&ctx, "demo").unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[1].method, Method::DELETE);
        assert!(requests[1].url.ends_with("/azureClusters/demo"));
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_list_clusters() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new().reply(json!({
            "azureClusters": [
                {"name": "projects/my-proj/locations/us-east4/azureClusters/a", "state": "RUNNING"},
                {"name": "projects/my-proj/locations/us-east4/azureClusters/b", "state": "PROVISIONING"}
            ],
            "nextPageToken": "more"
        }));
        let ctx = context(&settings, &runner, &transport, dir.path());

        list(&ctx).unwrap();
        assert!(transport.requests()[0].url.ends_with("/locations/us-east4/azureClusters"));
    }
}
