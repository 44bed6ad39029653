//! CLI command definitions and dispatch.

pub mod commit;
pub mod exec;
pub mod images;
pub mod init;
pub mod logs;
pub mod ps;
pub mod pull;
pub mod rm;
pub mod run;

use clap::{Parser, Subcommand};

use snapbox_common::config::EngineConfig;
use snapbox_common::constants;
use snapbox_core::btrfs::SubvolumeStore;

/// Snapbox — minimal container engine on btrfs snapshots.
#[derive(Parser, Debug)]
#[command(name = constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Btrfs root holding images and containers.
    #[arg(long, global = true, default_value = constants::DEFAULT_BTRFS_ROOT)]
    pub root: String,

    /// Host bridge containers attach to.
    #[arg(long, global = true, default_value = constants::DEFAULT_BRIDGE)]
    pub bridge: String,

    /// Upstream resolver for container DNS.
    #[arg(long, global = true, default_value = constants::DEFAULT_NAMESERVER)]
    pub nameserver: String,

    /// Legacy CPU share applied to new containers.
    #[arg(long = "cpu-share", global = true, default_value_t = constants::DEFAULT_CPU_SHARE)]
    pub cpu_share: u64,

    /// Memory ceiling in megabytes applied to new containers.
    #[arg(long = "mem-limit", global = true, default_value_t = constants::DEFAULT_MEM_LIMIT_MB)]
    pub mem_limit: u64,
}

impl Cli {
    /// Builds the immutable engine configuration from the global options
    /// and the environment.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        let registry_base = std::env::var(constants::REGISTRY_ENV)
            .unwrap_or_else(|_| constants::DEFAULT_REGISTRY_BASE.to_string());
        EngineConfig {
            btrfs_root: self.root.clone().into(),
            bridge: self.bridge.clone(),
            nameserver: self.nameserver.clone(),
            cpu_share: self.cpu_share,
            mem_limit_mb: self.mem_limit,
            registry_base,
            ..EngineConfig::default()
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an image from a local directory tree.
    Init(init::InitArgs),
    /// Fetch and materialize a remote image.
    Pull(pull::PullArgs),
    /// List images with their origins.
    Images,
    /// List containers with their commands.
    Ps,
    /// Create and run a container in the foreground.
    Run(run::RunArgs),
    /// Run a command inside a running container.
    Exec(exec::ExecArgs),
    /// Print a container's captured output.
    Logs(logs::LogsArgs),
    /// Replace an image with a container's state.
    Commit(commit::CommitArgs),
    /// Delete an image or container.
    Rm(rm::RmArgs),
}

/// Opens the snapshot store configured by the global options.
///
/// # Errors
///
/// Returns an error if the store root is not mounted.
pub fn open_store(config: &EngineConfig) -> anyhow::Result<SubvolumeStore> {
    Ok(SubvolumeStore::open(&config.btrfs_root)?)
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    match cli.command {
        Command::Init(args) => init::execute(args, &config),
        Command::Pull(args) => pull::execute(args, &config),
        Command::Images => images::execute(&config),
        Command::Ps => ps::execute(&config),
        Command::Run(args) => run::execute(args, &config),
        Command::Exec(args) => exec::execute(args, &config),
        Command::Logs(args) => logs::execute(args, &config),
        Command::Commit(args) => commit::execute(args, &config),
        Command::Rm(args) => rm::execute(args, &config),
    }
}
