use std::{fs::File, io::BufReader, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::allocate::Intervention;

/// Weights for the composite equity score. Scores are normalized by the
/// weight total, so only the ratios matter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub delay_risk: f64,
    pub ridership: f64,
    pub vulnerability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { delay_risk: 0.4, ridership: 0.3, vulnerability: 0.3 }
    }
}

/// Weights for the demographic vulnerability index (income deprivation,
/// minority share, transit dependency). Normalized by the weight total.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnerabilityWeights {
    pub income: f64,
    pub minority: f64,
    pub dependency: f64,
}

impl Default for VulnerabilityWeights {
    fn default() -> Self {
        Self { income: 1.0, minority: 1.0, dependency: 1.0 }
    }
}

/// Hyperparameters for the delay classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the shuffled train/test split.
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { learning_rate: 0.1, epochs: 200, test_fraction: 0.25, seed: 42 }
    }
}

/// All pipeline tunables in one structure, loaded once and passed by
/// reference into each stage. Nothing here is ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Catchment radius around each station, in meters.
    pub catchment_radius_m: f64,
    /// Vertex count of the polygon approximating the catchment disc.
    pub catchment_segments: usize,
    /// Minimum incident duration (minutes) that counts as a significant delay.
    pub significant_delay_minutes: f64,
    /// Minimum similarity for a fuzzy station-name match to be accepted.
    pub fuzzy_match_threshold: f64,
    /// Fraction of stations flagged high priority, from the top of the ranking.
    pub priority_quantile: f64,
    pub score_weights: ScoreWeights,
    pub vulnerability_weights: VulnerabilityWeights,
    pub classifier: ClassifierConfig,
    /// Intervention catalog available to the allocation optimizer.
    pub interventions: Vec<Intervention>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            catchment_radius_m: 500.0,
            catchment_segments: 64,
            significant_delay_minutes: 10.0,
            fuzzy_match_threshold: 0.85,
            priority_quantile: 0.23,
            score_weights: ScoreWeights::default(),
            vulnerability_weights: VulnerabilityWeights::default(),
            classifier: ClassifierConfig::default(),
            interventions: default_interventions(),
        }
    }
}

fn default_interventions() -> Vec<Intervention> {
    vec![
        Intervention { name: "signal modernization".into(), cost: 25_000_000.0, benefit_scale: 10.0 },
        Intervention { name: "accessibility upgrade".into(), cost: 40_000_000.0, benefit_scale: 8.0 },
        Intervention { name: "platform capacity".into(), cost: 15_000_000.0, benefit_scale: 5.0 },
        Intervention { name: "service frequency".into(), cost: 8_000_000.0, benefit_scale: 6.0 },
    ]
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields fall back to
    /// the documented defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Reject configurations that would make a stage silently meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.catchment_radius_m <= 0.0 {
            bail!("catchment_radius_m must be positive (got {})", self.catchment_radius_m);
        }
        if self.catchment_segments < 8 {
            bail!("catchment_segments must be at least 8 (got {})", self.catchment_segments);
        }
        if self.significant_delay_minutes <= 0.0 {
            bail!("significant_delay_minutes must be positive (got {})", self.significant_delay_minutes);
        }
        if !(0.0..=1.0).contains(&self.fuzzy_match_threshold) {
            bail!("fuzzy_match_threshold must be in [0, 1] (got {})", self.fuzzy_match_threshold);
        }
        if !(0.0..=1.0).contains(&self.priority_quantile) {
            bail!("priority_quantile must be in [0, 1] (got {})", self.priority_quantile);
        }
        let w = &self.score_weights;
        if w.delay_risk < 0.0 || w.ridership < 0.0 || w.vulnerability < 0.0
            || w.delay_risk + w.ridership + w.vulnerability <= 0.0
        {
            bail!("score weights must be non-negative with a positive total");
        }
        let v = &self.vulnerability_weights;
        if v.income < 0.0 || v.minority < 0.0 || v.dependency < 0.0
            || v.income + v.minority + v.dependency <= 0.0
        {
            bail!("vulnerability weights must be non-negative with a positive total");
        }
        if self.classifier.learning_rate <= 0.0 || self.classifier.epochs == 0 {
            bail!("classifier learning_rate and epochs must be positive");
        }
        if !(0.0..1.0).contains(&self.classifier.test_fraction) || self.classifier.test_fraction == 0.0 {
            bail!("classifier test_fraction must be in (0, 1)");
        }
        for intervention in &self.interventions {
            if intervention.cost <= 0.0 {
                bail!("intervention {:?} must have a positive cost", intervention.name);
            }
        }
        Ok(())
    }
}
