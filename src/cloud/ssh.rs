//! Per-cluster SSH key pairs for control-plane and node VMs

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::runner::{CommandRunner, DRY_RUN_PLACEHOLDER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyPair {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl SshKeyPair {
    /// `<dir>/<cluster>-ssh-key` and `<dir>/<cluster>-ssh-key.pub`
    pub fn for_cluster(dir: &Path, cluster: &str) -> Self {
        let private_key = dir.join(format!("{}-ssh-key", cluster));
        let public_key = dir.join(format!("{}-ssh-key.pub", cluster));
        Self {
            private_key,
            public_key,
        }
    }

    pub fn exists(&self) -> bool {
        self.private_key.exists()
    }

    /// Contents of the public key, as placed in `sshConfig.authorizedKey`
    pub fn authorized_key(&self) -> Result<String> {
        let key = fs::read_to_string(&self.public_key)
            .with_context(|| format!("Failed to read public key {}", self.public_key.display()))?;
        Ok(key.trim().to_string())
    }
}

/// Generate the key pair unless the private key file is already there
pub fn ensure_key_pair(runner: &dyn CommandRunner, dir: &Path, cluster: &str) -> Result<SshKeyPair> {
    let pair = SshKeyPair::for_cluster(dir, cluster);

    if pair.exists() {
        crate::log_info!("Reusing SSH key {}", pair.private_key.display());
        return Ok(pair);
    }

    crate::log_info!("Generating SSH key {}", pair.private_key.display());
    let path = pair.private_key.to_string_lossy();
    let comment = format!("anthos-{}", cluster);
    runner.run(
        "ssh-keygen",
        &[
            "-t", "rsa", "-m", "PEM", "-b", "4096", "-C", &comment, "-f", &path, "-N", "", "-q",
        ],
    )?;

    Ok(pair)
}

/// Authorized key for a cluster; a placeholder when a dry run skipped key generation
pub fn authorized_key_or_placeholder(pair: &SshKeyPair, dry_run: bool) -> Result<String> {
    if dry_run && !pair.public_key.exists() {
        return Ok(DRY_RUN_PLACEHOLDER.to_string());
    }
    pair.authorized_key()
}
