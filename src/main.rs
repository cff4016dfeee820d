//! azure-anthos CLI - Anthos clusters on Azure

use anyhow::{Result, anyhow};
use azure_anthos::api::HttpTransport;
use azure_anthos::cloud::SystemRunner;
use azure_anthos::commands::{self, Context};
use azure_anthos::config::Settings;
use azure_anthos::k8s::kubeconfig;
use azure_anthos::utils::{
    AnthosError, OutputFormat, Prerequisite, Tool, check_prerequisites, display_error_and_exit,
    dryrun, enhance_error, logger,
};
use azure_anthos::{log_error, log_info};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "azure-anthos")]
#[command(author, version, about = "Create and manage Anthos clusters on Azure", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv, -vvv)
    /// -v: INFO, -vv: DEBUG, -vvv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry-run mode: print mutating commands and requests instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to a config file (.toml, or KEY=value lines)
    #[arg(short, long, global = true, env = "AZURE_ANTHOS_CONFIG")]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the virtual network, subnet, NAT gateway and resource groups
    CreateNetwork,

    /// Delete the cluster and network resource groups
    DeleteNetwork,

    /// Create the AD application the API authenticates as
    CreateSecret,

    /// Delete the AD application
    DeleteSecret,

    /// Create a cluster
    CreateCluster {
        /// Cluster name
        cluster: String,
    },

    /// Show a cluster
    GetCluster {
        /// Cluster name
        cluster: String,
    },

    /// List clusters in the configured project and region
    ListClusters,

    /// Delete a cluster
    DeleteCluster {
        /// Cluster name
        cluster: String,
    },

    /// Merge cluster credentials into the kubeconfig and switch to its context
    GetCredentials {
        /// Cluster name
        cluster: String,
    },

    /// Create a node pool
    CreateNodepool {
        /// Cluster name
        cluster: String,
        /// Node pool name
        nodepool: String,
    },

    /// Show a node pool
    GetNodepool {
        /// Cluster name
        cluster: String,
        /// Node pool name
        nodepool: String,
    },

    /// List the node pools of a cluster
    ListNodepools {
        /// Cluster name
        cluster: String,
    },

    /// Delete a node pool
    DeleteNodepool {
        /// Cluster name
        cluster: String,
        /// Node pool name
        nodepool: String,
    },

    /// Show a long-running operation
    GetOperation {
        /// Operation ID or full resource name
        operation: String,
    },

    /// List long-running operations
    ListOperations,

    /// Show supported Kubernetes versions and Azure regions
    GetServerConfig,

    /// Print the identifiers derived from the az and gcloud CLIs
    GetEnv,

    /// Register a cluster with the fleet
    Register {
        /// Cluster name
        cluster: String,
    },

    /// Unregister a cluster from the fleet (best-effort)
    Unregister {
        /// Cluster name
        cluster: String,
    },

    /// Check prerequisites (az, gcloud, ssh-keygen)
    Check,

    /// Print an example config file
    Config,

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version go to stdout and succeed; usage errors exit 1
            if !e.use_stderr() {
                let _ = e.print();
                std::process::exit(0);
            }
            eprint!("{}", usage_error_text(&e));
            std::process::exit(1);
        }
    };

    logger::init(cli.verbose);

    if let Err(e) = run(cli) {
        display_error_and_exit(enhance_error(e));
    }
}

/// Parse error output; an unknown command also gets the full command listing
fn usage_error_text(err: &clap::Error) -> String {
    let mut text = err.render().to_string();
    if err.kind() == clap::error::ErrorKind::InvalidSubcommand {
        text.push('\n');
        text.push_str(&Cli::command().render_help().to_string());
    }
    text
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Check => return handle_check_command(),
        Commands::Config => return handle_config_command(),
        Commands::Completion { shell } => return handle_completion_command(shell),
        Commands::Version => return handle_version_command(),
        _ => {}
    }

    let settings = load_settings(cli.config.as_deref())?;

    if cli.dry_run {
        dryrun::announce();
    }

    let runner = SystemRunner::new(cli.dry_run);
    let transport = HttpTransport::new(
        Duration::from_secs(settings.api.timeout_secs),
        cli.dry_run,
    )?;
    let ctx = Context {
        settings: &settings,
        runner: &runner,
        transport: &transport,
        output: cli.output,
        dry_run: cli.dry_run,
        kubeconfig: kubeconfig::default_path()?,
    };

    dispatch(&ctx, cli.command)
}

fn load_settings(explicit: Option<&std::path::Path>) -> Result<Settings> {
    match explicit {
        Some(path) => Settings::load(Some(path)).map_err(|e| {
            AnthosError::config_error(&path.display().to_string(), &format!("{:#}", e)).into()
        }),
        None => Settings::load(None),
    }
}

fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::CreateNetwork => commands::network::create(ctx),
        Commands::DeleteNetwork => commands::network::delete(ctx),
        Commands::CreateSecret => commands::secret::create(ctx),
        Commands::DeleteSecret => commands::secret::delete(ctx),
        Commands::CreateCluster { cluster } => commands::cluster::create(ctx, &cluster),
        Commands::GetCluster { cluster } => commands::cluster::get(ctx, &cluster),
        Commands::ListClusters => commands::cluster::list(ctx),
        Commands::DeleteCluster { cluster } => commands::cluster::delete(ctx, &cluster),
        Commands::GetCredentials { cluster } => {
            commands::credentials::get_credentials(ctx, &cluster)
        }
        Commands::CreateNodepool { cluster, nodepool } => {
            commands::nodepool::create(ctx, &cluster, &nodepool)
        }
        Commands::GetNodepool { cluster, nodepool } => {
            commands::nodepool::get(ctx, &cluster, &nodepool)
        }
        Commands::ListNodepools { cluster } => commands::nodepool::list(ctx, &cluster),
        Commands::DeleteNodepool { cluster, nodepool } => {
            commands::nodepool::delete(ctx, &cluster, &nodepool)
        }
        Commands::GetOperation { operation } => commands::operation::get(ctx, &operation),
        Commands::ListOperations => commands::operation::list(ctx),
        Commands::GetServerConfig => commands::environment::get_server_config(ctx),
        Commands::GetEnv => commands::environment::get_env(ctx),
        Commands::Register { cluster } => commands::fleet::register(ctx, &cluster),
        Commands::Unregister { cluster } => commands::fleet::unregister(ctx, &cluster),
        Commands::Check | Commands::Config | Commands::Completion { .. } | Commands::Version => {
            unreachable!("handled before settings are loaded")
        }
    }
}

fn handle_check_command() -> Result<()> {
    log_info!("Checking prerequisites...");

    let prereqs: Vec<&dyn Prerequisite> = Tool::ALL
        .iter()
        .map(|tool| tool as &dyn Prerequisite)
        .collect();
    let report = check_prerequisites(&prereqs);

    for (name, path) in &report.found {
        println!("  {} {} ({})", "✓".green(), name, path.display());
    }
    for (name, hint) in &report.missing {
        println!("  {} {} (install: {})", "✗".red(), name, hint);
    }

    if report.is_satisfied() {
        println!("{}", "All prerequisites satisfied!".green());
        return Ok(());
    }

    log_error!("{} prerequisite(s) missing", report.missing.len());
    let names: Vec<&str> = report.missing.iter().map(|(name, _)| name.as_str()).collect();
    Err(anyhow!("Missing prerequisites: {}", names.join(", ")))
}

fn handle_config_command() -> Result<()> {
    print!("{}", Settings::example_config()?);
    Ok(())
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "azure-anthos", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<()> {
    println!("azure-anthos {}", env!("CARGO_PKG_VERSION"));
    println!("CLI for creating and managing Anthos clusters on Azure");
    Ok(())
}
