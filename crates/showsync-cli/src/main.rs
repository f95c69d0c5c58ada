use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, daemon, status, sync};
use showsync_config::PathManager;

mod commands;
mod logging;
mod metadata;
mod output;

#[derive(Parser)]
#[command(name = "showsync")]
#[command(about = "ShowSync - Keep your shows and movies in sync with the cloud and your social tracker")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass
    #[command(long_about = "Refresh show metadata, sync with the cloud and social providers that are enabled in the configuration, then recompute next episodes. The first run against a provider merges local and remote data; later runs only apply remote changes.")]
    Sync {
        /// Refresh metadata of every show, not only stale ones
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "show")]
        full: bool,

        /// Only refresh this show (TMDB id); providers are skipped
        #[arg(long, value_name = "TMDB_ID")]
        show: Option<u32>,

        /// Skip the cloud provider
        #[arg(long, action = ArgAction::SetTrue)]
        no_cloud: bool,

        /// Skip the social provider
        #[arg(long, action = ArgAction::SetTrue)]
        no_social: bool,
    },
    /// Run as daemon, syncing periodically
    #[command(long_about = "Run sync passes in a loop. The next pass starts once the interval has passed and the back-off after failed passes allows it. Logs go to a daily rolling file in the log directory.")]
    Daemon {
        /// Minutes between passes (overrides scheduler.interval_minutes)
        #[arg(long, value_name = "MINUTES")]
        interval: Option<u64>,

        /// Skip the sync on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_sync: bool,
    },
    /// Show checkpoints and back-off state
    Status,
    /// Clear sync state
    #[command(long_about = "Clear checkpoints (forces a merge sync next time), the local store, or both.")]
    Clear {
        /// Clear checkpoints, merge flags and back-off
        #[arg(long, action = ArgAction::SetTrue)]
        checkpoints: bool,

        /// Delete the local store
        #[arg(long, action = ArgAction::SetTrue)]
        store: bool,

        /// Clear everything
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["checkpoints", "store"])]
        all: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Write a configuration template
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Store an access token for a provider
    Token {
        /// Provider the token belongs to
        #[arg(value_enum)]
        provider: config::TokenProvider,

        /// Access token
        token: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = match cli.command {
        Commands::Daemon { .. } => Some(PathManager::default().daemon_log_file()),
        _ => None,
    };
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync { full, show, no_cloud, no_social } => {
            sync::run_sync(full, show, !no_cloud, !no_social, &output).await
        }
        Commands::Daemon { interval, no_startup_sync } => {
            daemon::run_daemon(interval, no_startup_sync, &output).await
        }
        Commands::Status => status::run_status(&output),
        Commands::Clear { checkpoints, store, all } => clear::run_clear(all, checkpoints, store, &output),
        Commands::Config { cmd } => config::run_config(cmd, &output),
    }
}
