use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::equity::EquityScore;

/// One intervention type from the catalog: what it costs at a station and
/// how strongly it converts equity score into benefit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub name: String,
    pub cost: f64,
    pub benefit_scale: f64,
}

/// A funded (station, intervention) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub station: String,
    pub borough: String,
    pub intervention: String,
    pub cost: f64,
    pub benefit: f64,
}

/// Borough-level rollup for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoroughSummary {
    pub borough: String,
    pub stations: u32,
    pub spend: f64,
    pub benefit: f64,
}

/// The allocation artifact: selections, borough rollups, and totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub budget: f64,
    pub total_cost: f64,
    pub total_benefit: f64,
    pub selections: Vec<Selection>,
    pub boroughs: Vec<BoroughSummary>,
}

/// Greedy benefit-per-cost selection under the budget. Candidates are the
/// high-priority stations crossed with the intervention catalog; at most one
/// intervention is funded per station. Deterministic for fixed inputs: ties
/// resolve by lower cost, then station name, then intervention name.
pub fn plan_allocation(
    scores: &[EquityScore],
    catalog: &[Intervention],
    budget: f64,
) -> AllocationPlan {
    struct Candidate<'a> {
        score: &'a EquityScore,
        intervention: &'a Intervention,
        benefit: f64,
        ratio: f64,
    }

    let mut candidates: Vec<Candidate> = scores
        .iter()
        .filter(|score| score.high_priority)
        .flat_map(|score| {
            catalog
                .iter()
                .filter(|intervention| intervention.cost > 0.0)
                .map(move |intervention| {
                    let benefit = intervention.benefit_scale * score.composite;
                    Candidate { score, intervention, benefit, ratio: benefit / intervention.cost }
                })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.ratio
            .partial_cmp(&a.ratio)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.intervention.cost.partial_cmp(&b.intervention.cost).unwrap_or(Ordering::Equal))
            .then_with(|| a.score.station.cmp(&b.score.station))
            .then_with(|| a.intervention.name.cmp(&b.intervention.name))
    });

    let mut remaining = budget;
    let mut funded: BTreeSet<&str> = BTreeSet::new();
    let mut selections: Vec<Selection> = Vec::new();
    for candidate in &candidates {
        if funded.contains(candidate.score.station.as_str()) {
            continue;
        }
        if candidate.intervention.cost > remaining {
            continue;
        }
        remaining -= candidate.intervention.cost;
        funded.insert(candidate.score.station.as_str());
        selections.push(Selection {
            station: candidate.score.station.clone(),
            borough: candidate.score.borough.clone(),
            intervention: candidate.intervention.name.clone(),
            cost: candidate.intervention.cost,
            benefit: candidate.benefit,
        });
    }

    let mut boroughs: BTreeMap<String, BoroughSummary> = BTreeMap::new();
    for selection in &selections {
        let summary = boroughs.entry(selection.borough.clone()).or_insert_with(|| BoroughSummary {
            borough: selection.borough.clone(),
            stations: 0,
            spend: 0.0,
            benefit: 0.0,
        });
        summary.stations += 1;
        summary.spend += selection.cost;
        summary.benefit += selection.benefit;
    }

    AllocationPlan {
        budget,
        total_cost: selections.iter().map(|s| s.cost).sum(),
        total_benefit: selections.iter().map(|s| s.benefit).sum(),
        selections,
        boroughs: boroughs.into_values().collect(),
    }
}
