#![doc = "Transit delay prediction and equity scoring pipeline"]
pub mod allocate;
pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod demog;
#[cfg(feature = "download")]
pub mod download;
pub mod equity;
pub mod features;
pub mod geo;
pub mod io;
pub mod model;
pub mod normalize;
pub mod report;

#[doc(inline)]
pub use config::PipelineConfig;

#[doc(inline)]
pub use equity::{score_stations, EquityScore, StationAssessment};

#[doc(inline)]
pub use allocate::{plan_allocation, AllocationPlan};

#[doc(inline)]
pub use report::RunSummary;
