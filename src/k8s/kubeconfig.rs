//! Kubeconfig model and merge into the shared kubeconfig file

use anyhow::{Context, Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clusters: Vec<NamedCluster>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<NamedContext>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<NamedUser>,
    #[serde(
        rename = "current-context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_context: Option<String>,
    /// preferences, extensions and anything else we leave untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default)]
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(
        rename = "certificate-authority-data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_data: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedContext {
    pub name: String,
    #[serde(default)]
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextEntry {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedUser {
    pub name: String,
    #[serde(default)]
    pub user: UserEntry,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// kubectl writes `clusters: null` once the last entry is removed
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Config".to_string()
}

impl Default for Kubeconfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            clusters: Vec::new(),
            contexts: Vec::new(),
            users: Vec::new(),
            current_context: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Insert or replace by name, keeping the original position of replaced entries
fn upsert<T>(entries: &mut Vec<T>, incoming: T, name: impl Fn(&T) -> &str) {
    match entries.iter().position(|e| name(e) == name(&incoming)) {
        Some(i) => entries[i] = incoming,
        None => entries.push(incoming),
    }
}

impl Kubeconfig {
    /// Single-cluster kubeconfig where cluster, user and context all carry `name`
    pub fn for_cluster(name: &str, endpoint: &str, ca_certificate_pem: &str, token: &str) -> Self {
        let server = if endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        };

        Self {
            clusters: vec![NamedCluster {
                name: name.to_string(),
                cluster: ClusterEntry {
                    server: Some(server),
                    certificate_authority_data: Some(STANDARD.encode(ca_certificate_pem)),
                    extra: BTreeMap::new(),
                },
            }],
            contexts: vec![NamedContext {
                name: name.to_string(),
                context: ContextEntry {
                    cluster: name.to_string(),
                    user: name.to_string(),
                    namespace: None,
                    extra: BTreeMap::new(),
                },
            }],
            users: vec![NamedUser {
                name: name.to_string(),
                user: UserEntry {
                    token: Some(token.to_string()),
                    extra: BTreeMap::new(),
                },
            }],
            current_context: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Entries from `incoming` replace same-named ones; its current context wins
    pub fn merge(&mut self, incoming: Kubeconfig) {
        for cluster in incoming.clusters {
            upsert(&mut self.clusters, cluster, |c| c.name.as_str());
        }
        for context in incoming.contexts {
            upsert(&mut self.contexts, context, |c| c.name.as_str());
        }
        for user in incoming.users {
            upsert(&mut self.users, user, |u| u.name.as_str());
        }
        if incoming.current_context.is_some() {
            self.current_context = incoming.current_context;
        }
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.contexts.iter().any(|c| c.name == name)
    }

    /// Read a kubeconfig; a missing or empty file is an empty config
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read kubeconfig: {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse kubeconfig: {}", path.display()))
    }
}

/// The shared kubeconfig: first entry of `$KUBECONFIG`, else `~/.kube/config`
pub fn default_path() -> Result<PathBuf> {
    if let Some(paths) = std::env::var_os("KUBECONFIG")
        && let Some(first) = std::env::split_paths(&paths).find(|p| !p.as_os_str().is_empty())
    {
        return Ok(first);
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".kube").join("config"))
}

/// `<path>.bak.<YYYYmmddHHMMSS>`, with `-N` appended if that name is taken
pub fn backup_path(path: &Path, now: DateTime<Local>) -> PathBuf {
    let base = format!("{}.bak.{}", path.display(), now.format("%Y%m%d%H%M%S"));
    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{}-{}", base, n));
        n += 1;
    }
    candidate
}

/// Where a merge wrote to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
}

/// Merge `incoming` into the kubeconfig at `path`.
///
/// An existing file is copied to a timestamped backup before anything is
/// written. The merged result goes to a temporary file in the same directory
/// and is renamed over `path`.
pub fn merge_into_file(path: &Path, incoming: Kubeconfig, now: DateTime<Local>) -> Result<MergeOutcome> {
    let mut config = Kubeconfig::load(path)?;

    let backup = if path.exists() {
        let backup = backup_path(path, now);
        fs::copy(path, &backup).with_context(|| {
            format!("Failed to back up {} to {}", path.display(), backup.display())
        })?;
        crate::log_info!("Backed up {} to {}", path.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    config.merge(incoming);
    write_atomic(path, &config)?;

    Ok(MergeOutcome {
        path: path.to_path_buf(),
        backup,
    })
}

fn write_atomic(path: &Path, config: &Kubeconfig) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let yaml = serde_yaml::to_string(config).context("Failed to serialize kubeconfig")?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp.write_all(yaml.as_bytes())?;
    temp.flush()?;
    temp.persist(path)
        .with_context(|| format!("Failed to write kubeconfig: {}", path.display()))?;

    Ok(())
}
