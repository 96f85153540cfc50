//! petrinet - Petri net simulator
//!
//! Loads net declarations, fires transitions and edits nets, either as
//! one-shot commands or in an interactive REPL.

mod commands;
mod config;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "petrinet")]
#[command(about = "Petri net simulator and editor")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, env = "PETRINET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start interactive REPL
    Repl {
        /// Declaration to load on start
        file: Option<PathBuf>,
    },

    /// Load and index a declaration, printing a summary and checksum
    Validate {
        /// Declaration JSON file
        file: PathBuf,
    },

    /// Show places, transitions, deltas and guards
    Show {
        /// Declaration JSON file
        file: PathBuf,
    },

    /// List transitions enabled in the initial marking
    Enabled {
        /// Declaration JSON file
        file: PathBuf,
    },

    /// Fire a sequence of actions from the initial marking
    Fire {
        /// Declaration JSON file
        file: PathBuf,

        /// Actions to fire, in order
        #[arg(required = true)]
        actions: Vec<String>,

        /// Multiplier applied to every firing
        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..))]
        multiple: Option<i64>,
    },

    /// Re-export the indexed net as JSON
    Export {
        /// Declaration JSON file
        file: PathBuf,

        /// Emit the full object form (offsets, deltas, guards)
        #[arg(long)]
        full: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return Err(e.into());
        }
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    match cli.command {
        Some(Commands::Repl { file }) => repl::run(&config, file.as_deref())?,
        None => repl::run(&config, None)?,
        Some(cmd) => match commands::execute(cmd, &config) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
