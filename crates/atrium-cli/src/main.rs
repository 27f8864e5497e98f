//! Atrium CLI - inspect record projections and edit checklist outlines
//!
//! Loads JSON fixtures into the in-memory collaborator so the aggregation
//! and hierarchy engines can be exercised from the terminal.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use atrium_core::config::load_engine_config;
use clap::Parser;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::checklist::run_checklist;
use crate::commands::completions::run_completions;
use crate::commands::view::run_view;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let directive = "atrium=info"
        .parse::<Directive>()
        .map_err(|error| CliError::Config(format!("invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::View(args) => {
            let config = load_engine_config(cli.config.as_deref())?;
            run_view(&args, config).await?;
        }
        Commands::Checklist {
            file,
            action,
            write,
            json,
        } => run_checklist(&file, action, write, json)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
