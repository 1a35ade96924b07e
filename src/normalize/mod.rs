mod calendar;
mod names;

pub use calendar::{calendar_features, parse_timestamp, season_of_month, CalendarFeatures, Season};
pub use names::{canonical_lines, similarity, NameMatch, NameNormalizer, NameResolver};
