//! Dirdex CLI - dirdex command

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cli_lib::config::{Config, ConfigOverrides, DEFAULT_PORT};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cmd;

/// Dirdex - jump to directories by name
#[derive(Parser)]
#[command(name = "dirdex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/dirdex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the index server
    Serve(ServeArgs),
    /// Resolve a directory name
    Get {
        /// Directory name (or fragment) to look up
        name: String,
        /// List all matching directories
        #[arg(short, long)]
        list: bool,
        /// Port the server listens on
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Stop a running server
    Stop {
        /// Port of the server to stop
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// The path to index
    #[arg(long)]
    root: Option<PathBuf>,
    /// Listen on this port
    #[arg(long)]
    port: Option<u16>,
    /// Comma-separated directory names or paths to skip while indexing
    #[arg(long)]
    skip_list: Option<String>,
    /// The shell history file to watch
    #[arg(long)]
    hist_file: Option<PathBuf>,
    /// Directory substituted for a leading ~ in history
    #[arg(long)]
    home: Option<PathBuf>,
    /// Seconds between history file polls
    #[arg(long)]
    monitor_interval: Option<u64>,
    /// Seconds between full re-index passes
    #[arg(long)]
    dir_interval: Option<u64>,
    /// Detach and run in the background
    #[arg(short, long)]
    daemon: bool,
}

impl ServeArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            root: self.root.clone(),
            skip_list: self.skip_list.clone(),
            hist_file: self.hist_file.clone(),
            home: self.home.clone(),
            monitor_interval_secs: self.monitor_interval,
            dir_interval_secs: self.dir_interval,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout belongs to `get` output consumed by the shell
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve(args) => {
            let mut config = Config::load(cli.config.as_deref())?;
            config.apply(args.overrides());
            cmd::serve::run(config, args.daemon).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Get { name, list, port } => cmd::get::run(&name, list, port).await,
        Commands::Stop { port } => {
            cmd::stop::run(port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
