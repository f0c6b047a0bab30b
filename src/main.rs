//! kiln - static asset pipeline with a live-reload dev server.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod pipeline;
mod reload;
mod stage;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, run};
use config::ProjectConfig;

fn main() -> Result<()> {
    // Before anything that may block
    let signal = core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = ProjectConfig::load(&cli)?;

    match cli.command() {
        Commands::Build => run::build_all(&config),
        Commands::Dev { .. } => {
            run::build_all(&config)?;
            run::serve(config, &signal)
        }
        Commands::Serve { .. } => run::serve(config, &signal),
        task => match task.single_stage() {
            Some(stage) => run::run_task(stage, &config),
            None => Ok(()),
        },
    }
}
