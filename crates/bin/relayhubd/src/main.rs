//! # relayhubd: relay program runner
//!
//! Composition root that wires storage, the relay controller and the
//! execution engine together behind a small CLI.
//!
//! ## Responsibilities
//! - Parse configuration (CLI args, env vars, config file)
//! - Initialize logging
//! - Open the `SQLite` database and run migrations
//! - Build the relay controller (virtual board or ESP over HTTP)
//! - Dispatch the requested subcommand
//! - Turn Ctrl-C during a run into an emergency stop
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod actuator;
mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::App;
use config::Config;

#[derive(Parser)]
#[command(
    name = "relayhubd",
    about = "Run timed relay programs on a four-output controller",
    version
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "RELAYHUB_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a program document, replacing any program with the same id
    Import {
        /// Path to the JSON document
        file: PathBuf,
    },
    /// Print a stored program as JSON
    Export {
        /// Program id or name
        program: String,
    },
    /// List stored programs
    List,
    /// Delete a stored program
    Delete {
        /// Program id or name
        program: String,
    },
    /// Run a program in the foreground; Ctrl-C stops it and switches every relay off
    Run {
        /// Program id or name
        program: String,
    },
    /// Show the most recent relay transitions, newest first
    History {
        /// Maximum number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Switch every relay off
    Stop,
    /// Show the current state of the four relays
    State,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {err}", config.logging.filter);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    init_tracing(&config);

    let app = App::connect(&config).await?;
    match cli.command {
        Commands::Import { file } => app.import(&file).await,
        Commands::Export { program } => app.export(&program).await,
        Commands::List => app.list().await,
        Commands::Delete { program } => app.delete(&program).await,
        Commands::Run { program } => app.run(&program).await,
        Commands::History { limit } => app.history(limit).await,
        Commands::Stop => app.stop().await,
        Commands::State => app.state().await,
    }
}
