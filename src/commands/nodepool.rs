//! Node pool command implementations

use anyhow::{Context as _, Result};
use std::collections::BTreeMap;

use super::{Context, print_started_operation, warn_if_truncated};
use crate::api::types::{
    AzureNodeConfig, AzureNodePool, AzureNodePoolAutoscaling, AzureSshConfig, MaxPodsConstraint,
};
use crate::cloud::ssh;
use crate::config::Settings;
use crate::utils::output;

const NODEPOOL_FIELDS: &[&str] = &[
    "name",
    "state",
    "version",
    "config.vmSize",
    "autoscaling.minNodeCount",
    "autoscaling.maxNodeCount",
    "maxPodsConstraint.maxPodsPerNode",
    "azureAvailabilityZone",
    "reconciling",
    "createTime",
];

const NODEPOOL_LIST_FIELDS: &[&str] = &[
    "name",
    "state",
    "version",
    "config.vmSize",
    "autoscaling.minNodeCount",
    "autoscaling.maxNodeCount",
];

/// Assemble the create-nodepool request body
pub fn build_node_pool(
    settings: &Settings,
    resource_name: String,
    subnet_id: String,
    authorized_key: String,
) -> AzureNodePool {
    let nodepool = &settings.nodepool;
    let short_name = output::short_name(&resource_name).to_string();

    AzureNodePool {
        name: resource_name,
        version: settings.nodepool_version().to_string(),
        config: AzureNodeConfig {
            vm_size: Some(nodepool.vm_size.clone()),
            ssh_config: AzureSshConfig { authorized_key },
            root_volume: None,
            tags: BTreeMap::from([("nodepool".to_string(), short_name)]),
        },
        subnet_id,
        autoscaling: AzureNodePoolAutoscaling {
            min_node_count: nodepool.min_nodes,
            max_node_count: nodepool.max_nodes,
        },
        max_pods_constraint: MaxPodsConstraint {
            max_pods_per_node: nodepool.max_pods_per_node,
        },
        ..Default::default()
    }
}

/// Handle create-nodepool
pub fn create(ctx: &Context, cluster: &str, nodepool: &str) -> Result<()> {
    crate::log_info!("Creating node pool {} in cluster {}", nodepool, cluster);

    // nodes share the control plane's key pair
    let key_pair = ssh::ensure_key_pair(ctx.runner, &ctx.ssh_key_dir(), cluster)?;
    let authorized_key = ssh::authorized_key_or_placeholder(&key_pair, ctx.dry_run)?;

    let client = ctx.client()?;
    let subnet_id = ctx.environment().subnet_id()?;

    let request = build_node_pool(
        ctx.settings,
        client.node_pool_name(cluster, nodepool),
        subnet_id,
        authorized_key,
    );
    let op = client
        .create_node_pool(cluster, nodepool, &request)
        .with_context(|| format!("Failed to create node pool {}/{}", cluster, nodepool))?;

    print_started_operation(&op, ctx.output)
}

/// Handle get-nodepool
pub fn get(ctx: &Context, cluster: &str, nodepool: &str) -> Result<()> {
    let pool = ctx
        .client()?
        .get_node_pool(cluster, nodepool)
        .with_context(|| format!("Failed to get node pool {}/{}", cluster, nodepool))?;
    let value = serde_json::to_value(&pool)?;
    output::print_document(&value, NODEPOOL_FIELDS, ctx.output)
}

/// Handle list-nodepools
pub fn list(ctx: &Context, cluster: &str) -> Result<()> {
    let response = ctx
        .client()?
        .list_node_pools(cluster)
        .with_context(|| format!("Failed to list node pools of {}", cluster))?;
    warn_if_truncated(&response.next_page_token);

    let items = response
        .azure_node_pools
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    output::print_list(&items, NODEPOOL_LIST_FIELDS, ctx.output)
}

/// Handle delete-nodepool
pub fn delete(ctx: &Context, cluster: &str, nodepool: &str) -> Result<()> {
    crate::log_info!("Deleting node pool {} from cluster {}", nodepool, cluster);

    let op = ctx
        .client()?
        .delete_node_pool(cluster, nodepool)
        .with_context(|| format!("Failed to delete node pool {}/{}", cluster, nodepool))?;

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
    fn test_create_nodepool_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.nodepool.max_nodes = 5;
        let runner = cloud_runner();
        let transport = FakeTransport::new().reply(json!({
            "name": "projects/my-proj/locations/us-east4/operations/op-2"
        }));
        let ctx = context(&settings, &runner, &transport, dir.path());

        fs::write(dir.path().join("demo-ssh-key"), "private").unwrap();
        fs::write(dir.path().join("demo-ssh-key.pub"), "ssh-rsa AAAA anthos-demo\n").unwrap();

        create(&ctx, "demo", "pool-1").unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert!(requests[0].url.ends_with(
            "/azureClusters/demo/azureNodePools?azureNodePoolId=pool-1"
        ));
        assert_eq!(requests[0].token, "ya29.token");

        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(
            body["name"],
            "projects/my-proj/locations/us-east4/azureClusters/demo/azureNodePools/pool-1"
        );
        assert_eq!(body["version"], "1.27.4-gke.900");
        assert_eq!(body["config"]["vmSize"], "Standard_DS2_v2");
        assert_eq!(body["config"]["sshConfig"]["authorizedKey"], "ssh-rsa AAAA anthos-demo");
        assert_eq!(body["autoscaling"]["minNodeCount"], 1);
        assert_eq!(body["autoscaling"]["maxNodeCount"], 5);
        assert_eq!(body["maxPodsConstraint"]["maxPodsPerNode"], "110");
        assert!(body["subnetId"].as_str().unwrap().ends_with("/subnets/default"));

        // the existing key pair was reused
        assert!(runner.mutations().is_empty());
    }

    #[test]
    fn test_nodepool_version_override() {
        let mut settings = Settings::default();
        settings.nodepool.version = Some("1.26.8-gke.200".to_string());
        let pool = build_node_pool(
            &settings,
            "projects/p/locations/l/azureClusters/c/azureNodePools/np".to_string(),
            "subnet".to_string(),
            "key".to_string(),
        );
        assert_eq!(pool.version, "1.26.8-gke.200");
        assert_eq!(pool.config.tags.get("nodepool").unwrap(), "np");
    }

    #[test]
    fn test_get_list_delete_nodepool() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new()
            .reply(json!({"name": "projects/my-proj/locations/us-east4/azureClusters/demo/azureNodePools/pool-1", "maxPodsConstraint": {"maxPodsPerNode": "110"}}))
            .reply(json!({"azureNodePools": []}))
            .reply(json!({"name": "projects/my-proj/locations/us-east4/operations/op-3"}));
        let ctx = context(&settings, &runner, &transport, dir.path());

        get(&ctx, "demo", "pool-1").unwrap();
        list(&ctx, "demo").unwrap();
        delete(&ctx, "demo", "pool-1").unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::GET);
        assert!(requests[0].url.ends_with("/azureClusters/demo/azureNodePools/pool-1"));
        assert!(requests[1].url.ends_with("/azureClusters/demo/azureNodePools"));
        assert_eq!(requests[2].method, Method::DELETE);
    }

    #[test]
    fn test_get_missing_nodepool_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new().reply_status(404);
        let ctx = context(&settings, &runner, &transport, dir.path());

        let err = get(&ctx, "demo", "missing").unwrap_err();
        let api = err.downcast_ref::<crate::api::ApiError>().unwrap();
        assert_eq!(api.status(), Some(404));
    }
}
