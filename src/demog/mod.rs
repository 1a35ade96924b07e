mod join;
mod tracts;

pub use join::{aggregate_catchment, county_to_borough, CatchmentProfile};
pub use tracts::{load_demographics, DemographicProfile, TractData, PROPORTION_TOLERANCE};
