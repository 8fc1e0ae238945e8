//! crossdock CLI - cross-target build and release orchestration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("crossdock=debug")
    } else {
        EnvFilter::new("crossdock=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Release(args) => commands::release::execute(args),
        Commands::Test(args) => commands::test::execute(args),
        Commands::Targets(args) => commands::targets::execute(args),
        Commands::Env(args) => commands::env::execute(args),
        Commands::Doctor(args) => commands::doctor::execute(args, cli.verbose),
        Commands::Jobs => commands::jobs::execute(),
        Commands::Clean(args) => commands::clean::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
