//! Blocking client for the multi-cloud cluster-management API

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use super::types::{
    AccessToken, AzureCluster, AzureNodePool, AzureServerConfig, ListAzureClustersResponse,
    ListAzureNodePoolsResponse, ListOperationsResponse, Operation,
};
use crate::utils::dryrun;
use crate::utils::progress::RequestProgress;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{method} {url} returned HTTP {status}: {message}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull `error.message` out of a Google API error body, falling back to the raw text
pub fn server_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Seam between the API client and the network
pub trait Transport {
    fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ApiError> {
        (**self).send(method, url, token, body)
    }
}

/// reqwest-backed transport. In dry-run mode only GET requests reach the network.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    dry_run: bool,
}

impl HttpTransport {
    pub fn new(timeout: Duration, dry_run: bool) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("azure-anthos/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, dry_run })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, ApiError> {
        if self.dry_run && method != Method::GET {
            dryrun::log_action(&format!("{} {}", method, url));
            if let Some(body) = body
                && let Ok(pretty) = serde_json::to_string_pretty(body)
            {
                eprintln!("{}", pretty);
            }
            return Ok(Value::Object(Map::new()));
        }

        tracing::debug!("{} {}", method, url);
        if let Some(body) = body {
            tracing::trace!("request body: {}", body);
        }

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let _progress = RequestProgress::new(&format!("{} {}", method, url));

        let response = request.send().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        let text = response.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!("{} {} -> {}", method, url, status);
        tracing::trace!("response body: {}", text);

        if !status.is_success() {
            return Err(ApiError::Status {
                method: method.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
                message: server_message(&text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Client scoped to one project and location
pub struct MultiCloudClient<T: Transport> {
    endpoint: String,
    project: String,
    location: String,
    token: String,
    transport: T,
}

impl<T: Transport> MultiCloudClient<T> {
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        location: impl Into<String>,
        token: impl Into<String>,
        transport: T,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            project: project.into(),
            location: location.into(),
            token: token.into(),
            transport,
        }
    }

    /// `projects/<p>/locations/<l>`
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    pub fn cluster_name(&self, cluster: &str) -> String {
        format!("{}/azureClusters/{}", self.parent(), cluster)
    }

    pub fn node_pool_name(&self, cluster: &str, node_pool: &str) -> String {
        format!("{}/azureNodePools/{}", self.cluster_name(cluster), node_pool)
    }

    /// Accepts a bare operation ID or a full `projects/...` resource name
    pub fn operation_name(&self, operation: &str) -> String {
        if operation.starts_with("projects/") {
            operation.to_string()
        } else {
            format!("{}/operations/{}", self.parent(), operation)
        }
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.endpoint, resource)
    }

    fn call<R: DeserializeOwned>(&self, method: Method, url: String, body: Option<Value>) -> Result<R> {
        let value = self
            .transport
            .send(method, &url, &self.token, body.as_ref())?;
        serde_json::from_value(value)
            .map_err(|source| ApiError::Decode { url, source }.into())
    }

    fn post<B: Serialize, R: DeserializeOwned>(&self, url: String, body: &B) -> Result<R> {
        let body = serde_json::to_value(body).context("Failed to serialize request body")?;
        self.call(Method::POST, url, Some(body))
    }

    fn get<R: DeserializeOwned>(&self, url: String) -> Result<R> {
        self.call(Method::GET, url, None)
    }

    fn delete<R: DeserializeOwned>(&self, url: String) -> Result<R> {
        self.call(Method::DELETE, url, None)
    }

    pub fn create_cluster(&self, cluster_id: &str, cluster: &AzureCluster) -> Result<Operation> {
        let url = format!(
            "{}?azureClusterId={}",
            self.url(&format!("{}/azureClusters", self.parent())),
            cluster_id
        );
        self.post(url, cluster)
    }

    pub fn get_cluster(&self, cluster_id: &str) -> Result<AzureCluster> {
        self.get(self.url(&self.cluster_name(cluster_id)))
    }

    pub fn list_clusters(&self) -> Result<ListAzureClustersResponse> {
        self.get(self.url(&format!("{}/azureClusters", self.parent())))
    }

    pub fn delete_cluster(&self, cluster_id: &str) -> Result<Operation> {
        self.delete(self.url(&self.cluster_name(cluster_id)))
    }

    pub fn generate_access_token(&self, cluster_id: &str) -> Result<AccessToken> {
        self.get(format!(
            "{}:generateAzureAccessToken",
            self.url(&self.cluster_name(cluster_id))
        ))
    }

    pub fn create_node_pool(
        &self,
        cluster_id: &str,
        node_pool_id: &str,
        node_pool: &AzureNodePool,
    ) -> Result<Operation> {
        let url = format!(
            "{}?azureNodePoolId={}",
            self.url(&format!("{}/azureNodePools", self.cluster_name(cluster_id))),
            node_pool_id
        );
        self.post(url, node_pool)
    }

    pub fn get_node_pool(&self, cluster_id: &str, node_pool_id: &str) -> Result<AzureNodePool> {
        self.get(self.url(&self.node_pool_name(cluster_id, node_pool_id)))
    }

    pub fn list_node_pools(&self, cluster_id: &str) -> Result<ListAzureNodePoolsResponse> {
        self.get(self.url(&format!("{}/azureNodePools", self.cluster_name(cluster_id))))
    }

    pub fn delete_node_pool(&self, cluster_id: &str, node_pool_id: &str) -> Result<Operation> {
        self.delete(self.url(&self.node_pool_name(cluster_id, node_pool_id)))
    }

    pub fn get_operation(&self, operation: &str) -> Result<Operation> {
        self.get(self.url(&self.operation_name(operation)))
    }

    pub fn list_operations(&self) -> Result<ListOperationsResponse> {
        self.get(self.url(&format!("{}/operations", self.parent())))
    }

    pub fn get_server_config(&self) -> Result<AzureServerConfig> {
        self.get(self.url(&format!("{}/azureServerConfig", self.parent())))
    }
}
