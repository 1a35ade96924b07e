use anyhow::Result;
use clap::Parser;

use metroequity::cli::{Cli, Commands};
use metroequity::commands::{allocate, extract, features, run, score, train};

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        #[cfg(feature = "download")]
        Commands::Download(args) => metroequity::commands::download::run(&cli, args),
        Commands::Extract(args) => extract::run(&cli, args),
        Commands::Features(args) => features::run(&cli, args),
        Commands::Train(args) => train::run(&cli, args),
        Commands::Score(args) => score::run(&cli, args),
        Commands::Allocate(args) => allocate::run(&cli, args),
        Commands::Run(args) => run::run(&cli, args),
    }
}
