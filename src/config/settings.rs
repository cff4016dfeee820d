//! Configuration file support for azure-anthos

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub azure: AzureSettings,

    #[serde(default)]
    pub gcp: GcpSettings,

    #[serde(default)]
    pub cluster: ClusterSettings,

    #[serde(default)]
    pub nodepool: NodePoolSettings,

    #[serde(default)]
    pub api: ApiSettings,
}

/// Azure-side resource names
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AzureSettings {
    #[serde(default = "default_azure_region")]
    pub region: String,

    #[serde(default = "default_cluster_resource_group")]
    pub cluster_resource_group: String,

    #[serde(default = "default_vnet_resource_group")]
    pub vnet_resource_group: String,

    #[serde(default = "default_vnet_name")]
    pub vnet_name: String,

    #[serde(default = "default_vnet_address_prefix")]
    pub vnet_address_prefix: String,

    #[serde(default = "default_subnet_name")]
    pub subnet_name: String,

    #[serde(default = "default_subnet_address_prefix")]
    pub subnet_address_prefix: String,

    /// Display name of the AD application the API authenticates as
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

/// Google Cloud side
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GcpSettings {
    /// Region hosting the multi-cloud API endpoint
    #[serde(default = "default_gcp_region")]
    pub region: String,

    /// Project ID. Falls back to `gcloud config get-value project`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// Control plane defaults for create-cluster
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClusterSettings {
    #[serde(default = "default_cluster_version")]
    pub version: String,

    #[serde(default = "default_vm_size")]
    pub control_plane_vm_size: String,

    #[serde(default = "default_pod_address_cidr")]
    pub pod_address_cidr: String,

    #[serde(default = "default_service_address_cidr")]
    pub service_address_cidr: String,

    /// Cluster admins. Empty means the active gcloud account.
    #[serde(default)]
    pub admin_users: Vec<String>,

    /// Directory holding `<cluster>-ssh-key` pairs
    #[serde(default = "default_ssh_key_dir")]
    pub ssh_key_dir: String,

    /// Fleet host project for automatic registration at create time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleet_project: Option<String>,
}

/// Node pool defaults for create-nodepool
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodePoolSettings {
    /// Kubernetes version; falls back to `cluster.version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_vm_size")]
    pub vm_size: String,

    #[serde(default = "default_min_nodes")]
    pub min_nodes: i32,

    #[serde(default = "default_max_nodes")]
    pub max_nodes: i32,

    #[serde(default = "default_max_pods_per_node")]
    pub max_pods_per_node: i64,
}

/// REST API settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiSettings {
    /// Override for `https://<gcp region>-gkemulticloud.googleapis.com/v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_azure_region() -> String {
    "eastus".to_string()
}

fn default_cluster_resource_group() -> String {
    "anthos-cluster-rg".to_string()
}

fn default_vnet_resource_group() -> String {
    "anthos-vnet-rg".to_string()
}

fn default_vnet_name() -> String {
    "anthos-vnet".to_string()
}

fn default_vnet_address_prefix() -> String {
    "10.0.0.0/16".to_string()
}

fn default_subnet_name() -> String {
    "default".to_string()
}

fn default_subnet_address_prefix() -> String {
    "10.0.1.0/24".to_string()
}

fn default_application_name() -> String {
    "anthos-azure-app".to_string()
}

fn default_gcp_region() -> String {
    "us-east4".to_string()
}

fn default_cluster_version() -> String {
    "1.27.4-gke.900".to_string()
}

fn default_vm_size() -> String {
    "Standard_DS2_v2".to_string()
}

fn default_pod_address_cidr() -> String {
    "10.200.0.0/16".to_string()
}

fn default_service_address_cidr() -> String {
    "10.32.0.0/24".to_string()
}

fn default_ssh_key_dir() -> String {
    ".".to_string()
}

fn default_min_nodes() -> i32 {
    1
}

fn default_max_nodes() -> i32 {
    3
}

fn default_max_pods_per_node() -> i64 {
    110
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            region: default_azure_region(),
            cluster_resource_group: default_cluster_resource_group(),
            vnet_resource_group: default_vnet_resource_group(),
            vnet_name: default_vnet_name(),
            vnet_address_prefix: default_vnet_address_prefix(),
            subnet_name: default_subnet_name(),
            subnet_address_prefix: default_subnet_address_prefix(),
            application_name: default_application_name(),
        }
    }
}

impl Default for GcpSettings {
    fn default() -> Self {
        Self {
            region: default_gcp_region(),
            project: None,
        }
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            version: default_cluster_version(),
            control_plane_vm_size: default_vm_size(),
            pod_address_cidr: default_pod_address_cidr(),
            service_address_cidr: default_service_address_cidr(),
            admin_users: Vec::new(),
            ssh_key_dir: default_ssh_key_dir(),
            fleet_project: None,
        }
    }
}

impl Default for NodePoolSettings {
    fn default() -> Self {
        Self {
            version: None,
            vm_size: default_vm_size(),
            min_nodes: default_min_nodes(),
            max_nodes: default_max_nodes(),
            max_pods_per_node: default_max_pods_per_node(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, the standard locations, or defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        match Self::find_config_file() {
            Some(path) => {
                crate::log_info!("Using config file: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                crate::log_info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load settings from a specific file.
    /// `.toml` files are parsed as TOML; anything else as shell-style `KEY=value` lines.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        let settings = if is_toml {
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::from_env_file(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        Ok(settings)
    }

    /// Parse a shell-sourced `KEY=value` file on top of the defaults
    pub fn from_env_file(contents: &str) -> Result<Self> {
        let mut settings = Self::default();

        for (lineno, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let words = shell_words::split(line)
                .with_context(|| format!("line {}: unbalanced quotes", lineno + 1))?;

            let assignment = match words.as_slice() {
                [export, assignment] if export == "export" => assignment,
                [assignment] => assignment,
                _ => return Err(anyhow!("line {}: expected KEY=value", lineno + 1)),
            };

            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| anyhow!("line {}: expected KEY=value", lineno + 1))?;

            if !settings.apply_env_pair(key, value) {
                crate::log_warn!("Ignoring unknown config key {} (line {})", key, lineno + 1);
            }
        }

        Ok(settings)
    }

    /// Apply one recognized key; returns false for unknown keys
    fn apply_env_pair(&mut self, key: &str, value: &str) -> bool {
        let value = value.to_string();
        match key {
            "AZURE_REGION" => self.azure.region = value,
            "CLUSTER_RESOURCE_GROUP" => self.azure.cluster_resource_group = value,
            "VNET_RESOURCE_GROUP" => self.azure.vnet_resource_group = value,
            "VNET_NAME" => self.azure.vnet_name = value,
            "VNET_ADDRESS_PREFIX" => self.azure.vnet_address_prefix = value,
            "SUBNET_NAME" => self.azure.subnet_name = value,
            "SUBNET_ADDRESS_PREFIX" => self.azure.subnet_address_prefix = value,
            "APPLICATION_NAME" => self.azure.application_name = value,
            "GCP_REGION" => self.gcp.region = value,
            "GCP_PROJECT" => self.gcp.project = Some(value),
            "CLUSTER_VERSION" => self.cluster.version = value,
            "CONTROL_PLANE_VM_SIZE" => self.cluster.control_plane_vm_size = value,
            "NODE_POOL_VM_SIZE" => self.nodepool.vm_size = value,
            "API_ENDPOINT" => self.api.endpoint = Some(value),
            _ => return false,
        }
        true
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .azure-anthos.toml in current directory
    /// 2. azure-anthos.env in current directory
    /// 3. ~/.config/azure-anthos/config.toml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        for local in [".azure-anthos.toml", "azure-anthos.env"] {
            let local_config = PathBuf::from(local);
            if local_config.exists() {
                return Some(local_config);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("azure-anthos").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Base URL of the multi-cloud API for the configured region
    pub fn api_endpoint(&self) -> String {
        match &self.api.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-gkemulticloud.googleapis.com/v1", self.gcp.region),
        }
    }

    /// Kubernetes version for new node pools
    pub fn nodepool_version(&self) -> &str {
        self.nodepool
            .version
            .as_deref()
            .unwrap_or(&self.cluster.version)
    }

    /// Generate example config file content
    pub fn example_config() -> Result<String> {
        let header = "# azure-anthos configuration file\n\
                      # Place this file at ~/.config/azure-anthos/config.toml or .azure-anthos.toml in your project\n\n";
        let body = toml::to_string_pretty(&Settings::default())
            .context("Failed to serialize settings")?;
        Ok(format!("{}{}", header, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.azure.region, "eastus");
        assert_eq!(settings.gcp.region, "us-east4");
        assert_eq!(settings.nodepool.max_pods_per_node, 110);
        assert!(settings.gcp.project.is_none());
    }

    #[test]
    fn test_settings_deserialization() {
        let toml_str = r#"
[azure]
region = "westeurope"
vnet_name = "my-vnet"

[gcp]
region = "europe-west1"
project = "my-project"

[nodepool]
max_nodes = 5
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.azure.region, "westeurope");
        assert_eq!(settings.azure.vnet_name, "my-vnet");
        assert_eq!(settings.azure.subnet_name, "default");
        assert_eq!(settings.gcp.project.as_deref(), Some("my-project"));
        assert_eq!(settings.nodepool.max_nodes, 5);
        assert_eq!(settings.nodepool.min_nodes, 1);
    }

    #[test]
    fn test_env_file_parsing() {
        let contents = r#"
# Region settings
AZURE_REGION=westus2
export GCP_REGION="us-west1"
VNET_NAME='vnet with spaces'
SOMETHING_ELSE=ignored
"#;
        let settings = Settings::from_env_file(contents).unwrap();
        assert_eq!(settings.azure.region, "westus2");
        assert_eq!(settings.gcp.region, "us-west1");
        assert_eq!(settings.azure.vnet_name, "vnet with spaces");
        assert_eq!(settings.azure.cluster_resource_group, "anthos-cluster-rg");
    }

    #[test]
    fn test_env_file_rejects_garbage() {
        assert!(Settings::from_env_file("NOT AN ASSIGNMENT HERE").is_err());
        assert!(Settings::from_env_file("KEY=\"unterminated").is_err());
    }

    #[test]
    fn test_load_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("config.toml");
        let mut f = fs::File::create(&toml_path).unwrap();
        writeln!(f, "[gcp]\nregion = \"asia-east2\"").unwrap();
        let settings = Settings::load_from_file(&toml_path).unwrap();
        assert_eq!(settings.gcp.region, "asia-east2");

        let env_path = dir.path().join("azure-anthos.env");
        fs::write(&env_path, "GCP_REGION=europe-west2\n").unwrap();
        let settings = Settings::load_from_file(&env_path).unwrap();
        assert_eq!(settings.gcp.region, "europe-west2");
    }

    #[test]
    fn test_api_endpoint() {
        let mut settings = Settings::default();
        assert_eq!(
            settings.api_endpoint(),
            "https://us-east4-gkemulticloud.googleapis.com/v1"
        );
        settings.api.endpoint = Some("http://localhost:8080/v1/".to_string());
        assert_eq!(settings.api_endpoint(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_nodepool_version_fallback() {
        let mut settings = Settings::default();
        assert_eq!(settings.nodepool_version(), settings.cluster.version);
        settings.nodepool.version = Some("1.26.0".to_string());
        assert_eq!(settings.nodepool_version(), "1.26.0");
    }

    #[test]
    fn test_example_config_round_trips() {
        let example = Settings::example_config().unwrap();
        assert!(example.contains("[azure]"));
        let parsed: Settings = toml::from_str(&example).unwrap();
        assert_eq!(parsed, Settings::default());
    }
}
