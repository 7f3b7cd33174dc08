mod cli;
mod commands;
mod confidence;
mod ensemble;
mod model;
mod reconcile;
mod registry;
mod review;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Registry(args) => commands::registry::run(args),
        Commands::Score(args) => commands::score::run(args),
        Commands::Consensus(args) => commands::consensus::run(args),
        Commands::Reconcile(args) => commands::reconcile::run(args),
        Commands::Review(args) => commands::review::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
