use anyhow::{Context, Result};
use polars::prelude::DataType;

use crate::allocate::plan_allocation;
use crate::cli::{AllocateArgs, Cli};
use crate::common::data::read_csv;
use crate::equity::EquityScore;
use crate::io::{commit_artifact, open_artifact};

use super::{load_config, ALLOCATION_ARTIFACT, EQUITY_ARTIFACT};

pub fn run(cli: &Cli, args: &AllocateArgs) -> Result<()> {
    let config = load_config(cli)?;

    let df = read_csv(&args.out_dir.join(EQUITY_ARTIFACT))
        .context("equity artifact missing; run `score` first")?;

    let names = df.column("station")?.str()?.clone();
    let boroughs = df.column("borough")?.str()?.clone();
    let risks = df.column("delay_risk")?.f64()?.clone();
    let ridership_scores = df.column("ridership_score")?.f64()?.clone();
    let vulnerabilities = df.column("vulnerability")?.f64()?.clone();
    let composites = df.column("composite")?.f64()?.clone();
    let ranks = df.column("rank")?.cast(&DataType::UInt32)?;
    let ranks = ranks.u32()?;
    let priorities = df.column("high_priority")?.bool()?.clone();

    let mut scores: Vec<EquityScore> = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let Some(station) = names.get(i) else { continue };
        scores.push(EquityScore {
            station: station.to_string(),
            borough: boroughs.get(i).unwrap_or("Unknown").to_string(),
            delay_risk: risks.get(i).unwrap_or(0.0),
            ridership_score: ridership_scores.get(i).unwrap_or(0.0),
            vulnerability: vulnerabilities.get(i).unwrap_or(0.0),
            composite: composites.get(i).unwrap_or(0.0),
            rank: ranks.get(i).unwrap_or(0),
            high_priority: priorities.get(i).unwrap_or(false),
        });
    }

    let plan = plan_allocation(&scores, &config.interventions, args.budget);
    if cli.verbose > 0 {
        for summary in &plan.boroughs {
            eprintln!(
                "[allocate] {}: {} stations, ${:.0} spend, {:.2} benefit",
                summary.borough, summary.stations, summary.spend, summary.benefit
            );
        }
    }

    let out_path = args.out_dir.join(ALLOCATION_ARTIFACT);
    let mut pending = open_artifact(&out_path, args.force)?;
    serde_json::to_writer_pretty(&mut pending, &plan)?;
    commit_artifact(pending)?;

    println!(
        "Selected {} interventions (${:.0} of ${:.0} budget, {:.2} total benefit) -> {}",
        plan.selections.len(),
        plan.total_cost,
        plan.budget,
        plan.total_benefit,
        out_path.display()
    );
    Ok(())
}
