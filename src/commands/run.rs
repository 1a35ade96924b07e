use anyhow::Result;

use crate::cli::{AllocateArgs, Cli, ExtractArgs, FeaturesArgs, RunArgs, ScoreArgs, TrainArgs};

use super::{allocate, extract, features, score, train};

/// The full batch pipeline, stage by stage. Each stage still reads its
/// inputs from and writes its artifacts to `out_dir`, so a partial run can
/// be resumed with the individual subcommands.
pub fn run(cli: &Cli, args: &RunArgs) -> Result<()> {
    extract::run(cli, &ExtractArgs {
        stations: args.stations.clone(),
        tracts: args.tracts.clone(),
        demographics: args.demographics.clone(),
        segments: args.segments.clone(),
        out_dir: args.out_dir.clone(),
        force: args.force,
    })?;

    features::run(cli, &FeaturesArgs {
        ridership: args.ridership.clone(),
        delays: args.delays.clone(),
        reliability: args.reliability.clone(),
        aliases: args.aliases.clone(),
        out_dir: args.out_dir.clone(),
        force: args.force,
    })?;

    train::run(cli, &TrainArgs { out_dir: args.out_dir.clone(), force: args.force })?;

    score::run(cli, &ScoreArgs { out_dir: args.out_dir.clone(), force: args.force })?;

    allocate::run(cli, &AllocateArgs {
        out_dir: args.out_dir.clone(),
        budget: args.budget,
        force: args.force,
    })?;

    Ok(())
}
