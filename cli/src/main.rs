//! Basket CLI - scenario runner for the fund's settlement and migration paths
//!
//! Loads a TOML scenario, builds an in-memory fund from it, settles the
//! listed trades against the chosen reference bidders, optionally casts the
//! migration spell, and prints what happened.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

mod config;
mod report;
mod scenario;

#[derive(Parser)]
#[command(name = "basket")]
#[command(about = "Basket fund CLI - run settlement and migration scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an example scenario
    Template {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a scenario without running it
    Check {
        /// Scenario file (TOML)
        scenario: PathBuf,
    },

    /// Run a scenario and report the outcome
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Template { output } => match output {
            Some(path) => {
                fs::write(&path, config::TEMPLATE)
                    .with_context(|| format!("Failed to write template: {}", path.display()))?;
                println!("{} {}", "Wrote".green(), path.display());
            }
            None => print!("{}", config::TEMPLATE),
        },
        Commands::Check { scenario: path } => {
            let config = config::load(&path)?;
            println!(
                "{} {} ({} token(s), {} trade(s){})",
                "✓".green(),
                path.display(),
                config.tokens.len(),
                config.trades.len(),
                if config.migration.is_some() { ", migration" } else { "" }
            );
        }
        Commands::Run { scenario: path, json } => {
            let config = config::load(&path)?;
            log::info!("Running scenario {}", path.display());
            let report = scenario::run(&config)?;
            if json {
                println!("{}", report::to_json(&report)?);
            } else {
                report::print(&report);
            }
        }
    }

    Ok(())
}
