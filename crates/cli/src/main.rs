//! Rolecast CLI: the main entry point.
//!
//! Commands:
//! - `transfer`: Run the money-transfer demo context
//! - `roles`:    Describe the demo context's roles and interactions
//! - `config`:   Show, locate, initialize or validate configuration

use clap::{Parser, Subcommand};
use rolecast_config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

mod bank;
mod commands;

#[derive(Parser)]
#[command(
    name = "rolecast",
    about = "Rolecast — Data-Context-Interaction runtime",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.rolecast/config.toml
    #[arg(short, long, global = true, env = "ROLECAST_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer money between two accounts through the DCI engine
    Transfer {
        /// Number of transfers to run
        #[arg(short, long)]
        times: Option<u32>,

        /// Amount per transfer, e.g. "200 €"
        #[arg(short, long)]
        amount: Option<String>,

        /// Opening balance of the source account, e.g. "1000 €"
        #[arg(long)]
        source: Option<String>,

        /// Opening balance of the target account, e.g. "0 €"
        #[arg(long)]
        target: Option<String>,
    },

    /// Describe the demo context's roles and interactions
    Roles,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration for problems
    Validate,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|name| std::env::var(name).ok())?;
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let loaded = load_config(cli.config.as_deref());

    // Initialize tracing
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    let json = loaded.as_ref().map(|c| c.logging.json).unwrap_or(false);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Config {
            action: ConfigAction::Validate,
        } => commands::config_cmd::validate(loaded)?,
        Commands::Config {
            action: ConfigAction::Path,
        } => commands::config_cmd::path()?,
        Commands::Config {
            action: ConfigAction::Init { force },
        } => commands::config_cmd::init(force)?,
        command => {
            let config = loaded.map_err(|e| format!("Failed to load config: {e}"))?;
            match command {
                Commands::Transfer {
                    times,
                    amount,
                    source,
                    target,
                } => commands::transfer::run(
                    &config,
                    commands::transfer::TransferArgs {
                        times,
                        amount,
                        source,
                        target,
                    },
                )?,
                Commands::Roles => commands::roles::run(&config)?,
                Commands::Config {
                    action: ConfigAction::Show,
                } => commands::config_cmd::show(&config)?,
                Commands::Config { .. } => unreachable!("handled above"),
            }
        }
    }

    Ok(())
}
