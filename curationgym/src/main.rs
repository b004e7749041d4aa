// src/main.rs
//! CurationGym entry point.

mod cli;
mod commands;
mod input;
mod logger;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    logger::init_logger(args.debug, args.quiet);

    match args.command {
        Commands::Curate(args) => commands::curate::run(args).await,
        Commands::Resume(args) => commands::resume::run(args).await,
        Commands::Inspect(args) => commands::inspect::run(args).await,
        Commands::Purge(args) => commands::purge::run(args).await,
    }
}
