pub mod allocate;
#[cfg(feature = "download")]
pub mod download;
pub mod extract;
pub mod features;
pub mod run;
pub mod score;
pub mod train;

use anyhow::Result;

use crate::cli::Cli;
use crate::config::PipelineConfig;

// Fixed artifact names inside the output directory; each stage reads its
// predecessors' artifacts from the same place.
pub const STATIONS_ARTIFACT: &str = "stations.parquet";
pub const FEATURES_ARTIFACT: &str = "features.parquet";
pub const PREDICTIONS_ARTIFACT: &str = "predictions.parquet";
pub const METRICS_ARTIFACT: &str = "metrics.json";
pub const EQUITY_ARTIFACT: &str = "equity_scores.csv";
pub const ALLOCATION_ARTIFACT: &str = "allocation.json";
pub const SUMMARY_ARTIFACT: &str = "run_summary.json";

pub(crate) fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
