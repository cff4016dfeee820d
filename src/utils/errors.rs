//! Enhanced error types with actionable suggestions

use crate::api::ApiError;
use crate::cloud::RunnerError;
use colored::Colorize;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static RESOURCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(azureClusters|azureNodePools|operations|memberships)/([A-Za-z0-9._-]+)")
        .expect("resource pattern is valid")
});

/// Enhanced error with suggestions and documentation links
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AnthosError {
    pub message: String,
    pub suggestions: Vec<String>,
    pub docs_link: Option<String>,
}

impl AnthosError {
    /// Create a new error with suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
            docs_link: None,
        }
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a documentation link
    pub fn with_docs(mut self, link: impl Into<String>) -> Self {
        self.docs_link = Some(link.into());
        self
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.message);

        if !self.suggestions.is_empty() {
            eprintln!();
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &self.suggestions {
                eprintln!("  {} {}", "→".blue(), suggestion);
            }
        }

        if let Some(docs) = &self.docs_link {
            eprintln!();
            eprintln!("{} {}", "Documentation:".cyan(), docs);
        }
    }

    // Common error patterns

    /// Resource not found (HTTP 404)
    pub fn resource_not_found(message: &str, resource: Option<(&str, &str)>) -> Self {
        let mut err = Self::new(message.to_string());
        match resource {
            Some(("azureClusters", name)) => {
                err = err
                    .suggest(format!("Cluster '{}' may not exist in this project/region", name))
                    .suggest("List clusters with: azure-anthos list-clusters");
            }
            Some(("azureNodePools", name)) => {
                err = err
                    .suggest(format!("Node pool '{}' may not exist", name))
                    .suggest("List node pools with: azure-anthos list-nodepools <CLUSTER>");
            }
            Some(("operations", _)) => {
                err = err.suggest("List operations with: azure-anthos list-operations");
            }
            _ => {
                err = err.suggest("Verify the resource name and the configured GCP region");
            }
        }
        err
    }

    /// Resource already exists (HTTP 409)
    pub fn already_exists(message: &str) -> Self {
        Self::new(message.to_string())
            .suggest("Pick a different name or delete the existing resource first")
            .suggest("Check pending operations with: azure-anthos list-operations")
    }

    /// Permission denied error (HTTP 401/403)
    pub fn permission_denied(message: &str) -> Self {
        Self::new(message.to_string())
            .suggest("Refresh credentials with: gcloud auth login")
            .suggest("Verify the project has the GKE Multi-Cloud API enabled")
            .suggest("Verify your account holds roles/gkemulticloud.admin")
    }

    /// Tool not found error
    pub fn tool_not_found(tool: &str, install_hint: &str) -> Self {
        Self::new(format!("Required tool '{}' not found", tool))
            .suggest(format!("Install with: {}", install_hint))
            .suggest("Ensure the tool is in your PATH")
            .suggest("Run 'azure-anthos check' to see all prerequisites")
    }

    /// Azure CLI not logged in
    pub fn azure_not_logged_in() -> Self {
        Self::new("Not logged into the Azure CLI")
            .suggest("Log in with: az login")
            .suggest("Select a subscription with: az account set --subscription <ID>")
    }

    /// Google Cloud CLI not logged in
    pub fn gcloud_not_logged_in() -> Self {
        Self::new("Not logged into the Google Cloud CLI")
            .suggest("Log in with: gcloud auth login")
            .suggest("Select a project with: gcloud config set project <PROJECT>")
    }

    /// Kubeconfig context missing for a cluster
    pub fn context_not_found(cluster: &str) -> Self {
        Self::new(format!("No kubeconfig context named '{}'", cluster))
            .suggest(format!(
                "Fetch credentials first with: azure-anthos get-credentials {}",
                cluster
            ))
    }

    /// Configuration file error
    pub fn config_error(path: &str, reason: &str) -> Self {
        Self::new(format!("Failed to load config from {}: {}", path, reason))
            .suggest("Verify the file exists and is readable")
            .suggest("TOML files need a .toml extension, anything else is read as KEY=value lines")
    }
}

/// Helper to display error and exit
pub fn display_error_and_exit(error: AnthosError) -> ! {
    error.display();
    std::process::exit(1);
}

/// Convert anyhow error to AnthosError when possible
pub fn enhance_error(err: anyhow::Error) -> AnthosError {
    if let Some(enhanced) = err.downcast_ref::<AnthosError>() {
        return AnthosError {
            message: enhanced.message.clone(),
            suggestions: enhanced.suggestions.clone(),
            docs_link: enhanced.docs_link.clone(),
        };
    }

    let message = format!("{:#}", err);

    for cause in err.chain() {
        if let Some(api_err) = cause.downcast_ref::<ApiError>() {
            return match api_err.status() {
                Some(401) | Some(403) => AnthosError::permission_denied(&message),
                Some(404) => {
                    let rendered = api_err.to_string();
                    let resource = extract_resource(&rendered);
                    AnthosError::resource_not_found(&message, resource)
                }
                Some(409) => AnthosError::already_exists(&message),
                _ => AnthosError::new(message)
                    .suggest("Run with -vv to see the request and response"),
            };
        }

        if let Some(runner_err) = cause.downcast_ref::<RunnerError>() {
            match runner_err {
                RunnerError::Spawn { program, source }
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    let hint = crate::utils::prereqs::install_hint(program);
                    return AnthosError::tool_not_found(program, hint);
                }
                RunnerError::Failed { stderr, .. } if stderr.contains("az login") => {
                    return AnthosError::azure_not_logged_in();
                }
                RunnerError::Failed { stderr, .. }
                    if stderr.contains("gcloud auth login")
                        || stderr.contains("gcloud config set account") =>
                {
                    return AnthosError::gcloud_not_logged_in();
                }
                _ => {}
            }
        }
    }

    // Default error with generic suggestion
    AnthosError::new(message)
        .suggest("Run with -v for more details")
        .suggest("Use --dry-run to see the commands that would be executed")
}

/// Extract the collection and name of the last resource referenced in a message
fn extract_resource(msg: &str) -> Option<(&str, &str)> {
    RESOURCE_PATTERN.captures_iter(msg).last().map(|caps| {
        let (_, [collection, name]) = caps.extract();
        (collection, name)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_docs() {
        let err = AnthosError::new("test error").with_docs("https://example.com");
        assert!(err.docs_link.is_some());
    }

    #[test]
    fn test_error_suggestions() {
        let err = AnthosError::new("test")
            .suggest("suggestion 1")
            .suggest("suggestion 2");
        assert_eq!(err.suggestions.len(), 2);
    }

    #[test]
    fn test_extract_resource_takes_last_match() {
        let msg = "GET https://x/v1/projects/p/locations/l/azureClusters/demo/azureNodePools/pool-1 returned HTTP 404";
        assert_eq!(extract_resource(msg), Some(("azureNodePools", "pool-1")));
        assert_eq!(extract_resource("nothing here"), None);
    }

    #[test]
    fn test_enhance_not_found_api_error() {
        let api_err = ApiError::Status {
            method: "GET".to_string(),
            url: "https://x/v1/projects/p/locations/l/azureClusters/demo".to_string(),
            status: 404,
            message: "not found".to_string(),
        };
        let enhanced = enhance_error(anyhow::Error::new(api_err).context("Failed to get cluster"));
        assert!(enhanced.message.contains("Failed to get cluster"));
        assert!(enhanced.suggestions.iter().any(|s| s.contains("'demo'")));
    }

    #[test]
    fn test_enhance_forbidden_api_error() {
        let api_err = ApiError::Status {
            method: "POST".to_string(),
            url: "https://x/v1/projects/p/locations/l/azureClusters".to_string(),
            status: 403,
            message: "permission denied".to_string(),
        };
        let enhanced = enhance_error(anyhow::Error::new(api_err));
        assert!(enhanced.suggestions.iter().any(|s| s.contains("gcloud auth login")));
    }

    #[test]
    fn test_enhance_missing_tool() {
        let runner_err = RunnerError::Spawn {
            program: "az".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let enhanced = enhance_error(anyhow::Error::new(runner_err));
        assert!(enhanced.message.contains("'az'"));
    }

    #[test]
    fn test_enhance_generic_error() {
        let enhanced = enhance_error(anyhow::anyhow!("something odd"));
        assert_eq!(enhanced.message, "something odd");
        assert_eq!(enhanced.suggestions.len(), 2);
    }
}
