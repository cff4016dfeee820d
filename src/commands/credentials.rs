//! get-credentials: merge a cluster into the shared kubeconfig

use anyhow::{Context as _, Result, anyhow};
use chrono::Local;
use colored::Colorize;

use super::Context;
use crate::k8s::kubeconfig::{self, Kubeconfig};
use crate::utils::dryrun;

/// Handle get-credentials
pub fn get_credentials(ctx: &Context, name: &str) -> Result<()> {
    let client = ctx.client()?;

    let cluster = client
        .get_cluster(name)
        .with_context(|| format!("Failed to get cluster {}", name))?;
    let endpoint = cluster
        .endpoint
        .as_deref()
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            anyhow!(
                "Cluster {} has no endpoint yet (state: {})",
                name,
                cluster.state.as_deref().unwrap_or("UNKNOWN")
            )
        })?;
    let ca = cluster
        .cluster_ca_certificate
        .as_deref()
        .ok_or_else(|| anyhow!("Cluster {} has no CA certificate yet", name))?;

    let token = client
        .generate_access_token(name)
        .with_context(|| format!("Failed to generate an access token for {}", name))?;

    let incoming = Kubeconfig::for_cluster(name, endpoint, ca, &token.access_token);
    let path = &ctx.kubeconfig;

    dryrun::exec_unless_dry_run(
        ctx.dry_run,
        &format!("merge context {} into {}", name, path.display()),
        || {
            let outcome = kubeconfig::merge_into_file(path, incoming, Local::now())?;
            if let Some(backup) = &outcome.backup {
                println!("Backed up {} to {}", outcome.path.display(), backup.display());
            }
            println!(
                "{} {} (context {})",
                "Kubeconfig updated:".green(),
                outcome.path.display(),
                name.bold()
            );
            println!("{}", expiry_notice(name, token.expire_time.as_deref()).yellow());
            Ok(())
        },
    )
}

/// The merged user holds a static token, so the context stops working once it lapses
fn expiry_notice(name: &str, expire_time: Option<&str>) -> String {
    let rerun = format!("run `azure-anthos get-credentials {}` again to refresh it", name);
    match expire_time {
        Some(expiry) => format!("Token expires at {}; {}", expiry, rerun),
        None => format!("Token is short-lived; {}", rerun),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, cloud_runner, context, settings_in};
    use reqwest::Method;
    use serde_json::json;
    use std::fs;

    fn cluster_reply() -> serde_json::Value {
        json!({
            "name": "projects/my-proj/locations/us-east4/azureClusters/demo",
            "state": "RUNNING",
            "endpoint": "10.0.1.4",
            "clusterCaCertificate": "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n"
        })
    }

    #[test]
    fn test_get_credentials_merges_with_one_backup() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new()
            .reply(cluster_reply())
            .reply(json!({"accessToken": "cluster-token", "expireTime": "2026-10-18T10:00:00Z"}));
        let ctx = context(&settings, &runner, &transport, dir.path());

        let existing = "apiVersion: v1\nkind: Config\nclusters: []\ncontexts: []\nusers: []\ncurrent-context: other\n";
        fs::write(&ctx.kubeconfig, existing).unwrap();

        get_credentials(&ctx, "demo").unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::GET);
        assert!(requests[1].url.ends_with("/azureClusters/demo:generateAzureAccessToken"));

        let merged = Kubeconfig::load(&ctx.kubeconfig).unwrap();
        assert_eq!(merged.current_context.as_deref(), Some("demo"));
        assert_eq!(merged.users[0].user.token.as_deref(), Some("cluster-token"));
        assert_eq!(
            merged.clusters[0].cluster.server.as_deref(),
            Some("https://10.0.1.4")
        );

        let backups: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with("kubeconfig.bak."))
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn test_expiry_notice_says_how_to_refresh() {
        let notice = expiry_notice("demo", Some("2026-10-18T10:00:00Z"));
        assert!(notice.contains("2026-10-18T10:00:00Z"));
        assert!(notice.contains("azure-anthos get-credentials demo"));

        let notice = expiry_notice("demo", None);
        assert!(notice.contains("short-lived"));
        assert!(notice.contains("get-credentials demo"));
    }

    #[test]
    fn test_get_credentials_requires_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new().reply(json!({
            "name": "projects/my-proj/locations/us-east4/azureClusters/demo",
            "state": "PROVISIONING"
        }));
        let ctx = context(&settings, &runner, &transport, dir.path());

        let err = get_credentials(&ctx, "demo").unwrap_err();
        assert!(err.to_string().contains("PROVISIONING"));
        assert!(!ctx.kubeconfig.exists());
    }

    #[test]
    fn test_dry_run_leaves_kubeconfig_alone() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let runner = cloud_runner();
        let transport = FakeTransport::new()
            .reply(cluster_reply())
            .reply(json!({"accessToken": "cluster-token"}));
        let mut ctx = context(&settings, &runner, &transport, dir.path());
        ctx.dry_run = true;

        get_credentials(&ctx, "demo").unwrap();
        assert!(!ctx.kubeconfig.exists());
    }
}
