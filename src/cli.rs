use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Transit equity pipeline CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "metroequity", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Pipeline configuration file (JSON); built-in defaults when omitted
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the hourly ridership dataset from the open-data portal
    #[cfg(feature = "download")]
    Download(DownloadArgs),

    /// Build station catchments and per-station demographic features
    Extract(ExtractArgs),

    /// Build the merged per-station-per-month feature table
    Features(FeaturesArgs),

    /// Train the delay classifier and write evaluation metrics
    Train(TrainArgs),

    /// Compute equity scores and the priority ranking
    Score(ScoreArgs),

    /// Select interventions under a budget constraint
    Allocate(AllocateArgs),

    /// Run the full pipeline end to end
    Run(RunArgs),
}

#[cfg(feature = "download")]
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Output directory for chunk CSVs
    #[arg(value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Stop after this many pages (omit to fetch everything)
    #[arg(long)]
    pub max_batches: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Map extract with station points (.shp or .csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub stations: PathBuf,

    /// TIGER tract geometries (.zip bundle or .shp)
    #[arg(value_hint = ValueHint::FilePath)]
    pub tracts: PathBuf,

    /// Tract-level demographic table (.csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub demographics: PathBuf,

    /// Street-network segment layer to tally into the run summary (.shp)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub segments: Option<PathBuf>,

    /// Artifact directory
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Overwrite existing artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// Hourly ridership table (.csv, .csv.gz, or a directory of chunks)
    #[arg(value_hint = ValueHint::AnyPath)]
    pub ridership: PathBuf,

    /// Delay incident table (.csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub delays: PathBuf,

    /// Reliability (MDBF) table (.csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub reliability: PathBuf,

    /// Optional station-name alias table (alias,canonical CSV)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub aliases: Option<PathBuf>,

    /// Artifact directory (must already hold stations.parquet)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Overwrite existing artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Artifact directory (must already hold features.parquet)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Overwrite existing artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Artifact directory (features.parquet, predictions.parquet, stations.parquet)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Overwrite existing artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct AllocateArgs {
    /// Artifact directory (must already hold equity_scores.csv)
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Total intervention budget in dollars
    #[arg(long)]
    pub budget: f64,

    /// Overwrite existing artifacts
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Map extract with station points (.shp or .csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub stations: PathBuf,

    /// TIGER tract geometries (.zip bundle or .shp)
    #[arg(value_hint = ValueHint::FilePath)]
    pub tracts: PathBuf,

    /// Tract-level demographic table (.csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub demographics: PathBuf,

    /// Hourly ridership table (.csv, .csv.gz, or a directory of chunks)
    #[arg(value_hint = ValueHint::AnyPath)]
    pub ridership: PathBuf,

    /// Delay incident table (.csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub delays: PathBuf,

    /// Reliability (MDBF) table (.csv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub reliability: PathBuf,

    /// Street-network segment layer to tally into the run summary (.shp)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub segments: Option<PathBuf>,

    /// Optional station-name alias table (alias,canonical CSV)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub aliases: Option<PathBuf>,

    /// Total intervention budget in dollars
    #[arg(long)]
    pub budget: f64,

    /// Artifact directory
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out_dir: PathBuf,

    /// Overwrite existing artifacts
    #[arg(long)]
    pub force: bool,
}
