mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use hostinit_core::paths;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hostinit",
    about = "Boot-time host provisioning: run configuration actions once, across reboots",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, global = true, env = "HOSTINIT_CONFIG", default_value = paths::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the host: run pending actions, then reboot or exit
    Run {
        /// Do not wait for the init system to finish booting
        #[arg(long)]
        no_wait: bool,
    },

    /// Show the recorded outcome of every configured action
    Status,

    /// Forget recorded outcomes so actions run again on the next boot
    Reset {
        /// Action to reset
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        action: Option<String>,

        /// Reset every recorded action
        #[arg(long)]
        all: bool,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_path();

    let result = match cli.command {
        Commands::Run { no_wait } => cmd::run::run(config_path, no_wait, cli.json),
        Commands::Status => cmd::status::run(config_path, cli.json),
        Commands::Reset { action, all } => {
            cmd::reset::run(config_path, action.as_deref(), all, cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(config_path, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
