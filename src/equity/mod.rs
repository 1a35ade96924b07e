use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::{ScoreWeights, VulnerabilityWeights};

/// Per-station inputs to the equity scorer, aggregated across that
/// station's feature rows.
#[derive(Debug, Clone)]
pub struct StationAssessment {
    pub station: String,
    pub borough: String,
    /// Mean predicted delay probability, already in [0, 1].
    pub delay_risk: f64,
    /// Total entries over the analysis window.
    pub ridership: f64,
    /// Demographic vulnerability index in [0, 1].
    pub vulnerability: f64,
}

/// Composite equity-impact score and ranking for one station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityScore {
    pub station: String,
    pub borough: String,
    pub delay_risk: f64,
    /// Ridership scaled by the maximum station total, in [0, 1].
    pub ridership_score: f64,
    pub vulnerability: f64,
    /// Weighted sum of the three components, normalized by the weight total.
    pub composite: f64,
    /// 1-based position in the descending ranking.
    pub rank: u32,
    /// Inside the configured top quantile.
    pub high_priority: bool,
}

/// Demographic vulnerability index: weighted combination of income
/// deprivation, minority share, and transit dependency, normalized by the
/// weight total so the index stays in [0, 1].
pub fn vulnerability_index(
    income_deprivation: f64,
    minority_share: f64,
    transit_dependency: f64,
    weights: &VulnerabilityWeights,
) -> f64 {
    let total = weights.income + weights.minority + weights.dependency;
    if total <= 0.0 {
        return 0.0;
    }
    (weights.income * income_deprivation
        + weights.minority * minority_share
        + weights.dependency * transit_dependency)
        / total
}

/// Rank stations by composite equity impact. Fully reproducible: stable
/// descending sort with ties broken by station name, then the top
/// `priority_quantile` share flagged high priority.
pub fn score_stations(
    assessments: &[StationAssessment],
    weights: &ScoreWeights,
    priority_quantile: f64,
) -> Vec<EquityScore> {
    let max_ridership = assessments
        .iter()
        .map(|a| a.ridership)
        .fold(0.0f64, f64::max);
    let weight_total = weights.delay_risk + weights.ridership + weights.vulnerability;

    let mut scored: Vec<EquityScore> = assessments
        .iter()
        .map(|a| {
            let ridership_score = if max_ridership > 0.0 { a.ridership / max_ridership } else { 0.0 };
            let composite = if weight_total > 0.0 {
                (weights.delay_risk * a.delay_risk
                    + weights.ridership * ridership_score
                    + weights.vulnerability * a.vulnerability)
                    / weight_total
            } else {
                0.0
            };
            EquityScore {
                station: a.station.clone(),
                borough: a.borough.clone(),
                delay_risk: a.delay_risk,
                ridership_score,
                vulnerability: a.vulnerability,
                composite,
                rank: 0,
                high_priority: false,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.composite
            .partial_cmp(&a.composite)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.station.cmp(&b.station))
    });

    let cutoff = ((scored.len() as f64) * priority_quantile).ceil() as usize;
    for (i, score) in scored.iter_mut().enumerate() {
        score.rank = (i + 1) as u32;
        score.high_priority = priority_quantile > 0.0 && i < cutoff;
    }
    scored
}
