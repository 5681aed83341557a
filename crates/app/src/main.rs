use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod logging;
mod sample;

use cli::{Cli, Commands};
use config::Config;

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    // `sample` works without a config.
    if let Commands::Sample(args) = &cli.command {
        return commands::sample(args);
    }
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Extract(args) => commands::extract(&config, args),
        Commands::Price(args) => commands::price(&config, args),
        Commands::Analyze(args) => commands::analyze(&config, args),
        Commands::Info => commands::info(&config, cli.config.as_deref()),
        Commands::Sample(args) => commands::sample(args),
    }
}
