use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// Fixed month-to-season mapping: Dec-Feb winter, Mar-May spring,
/// Jun-Aug summer, Sep-Nov fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

pub fn season_of_month(month: u32) -> Season {
    match month {
        12 | 1 | 2 => Season::Winter,
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Fall,
        other => unreachable!("month out of range: {other}"),
    }
}

/// Timestamp formats seen across the source datasets: ISO with optional
/// fractional seconds (API exports), space-separated, and the portal's
/// 12-hour export format.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
];

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw.trim(), format) {
            return Ok(dt);
        }
    }
    bail!("unrecognized timestamp: {raw:?}");
}

/// Calendar features shared by every time-keyed dataset after alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub weekday: bool,
    pub season: Season,
}

pub fn calendar_features(dt: &NaiveDateTime) -> CalendarFeatures {
    CalendarFeatures {
        year: dt.year(),
        month: dt.month(),
        weekday: !matches!(dt.weekday(), Weekday::Sat | Weekday::Sun),
        season: season_of_month(dt.month()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_boundaries() {
        assert_eq!(season_of_month(12), Season::Winter);
        assert_eq!(season_of_month(2), Season::Winter);
        assert_eq!(season_of_month(3), Season::Spring);
        assert_eq!(season_of_month(5), Season::Spring);
        assert_eq!(season_of_month(6), Season::Summer);
        assert_eq!(season_of_month(8), Season::Summer);
        assert_eq!(season_of_month(9), Season::Fall);
        assert_eq!(season_of_month(11), Season::Fall);
    }

    #[test]
    fn parses_iso_and_portal_formats() {
        let iso = parse_timestamp("2023-07-04T14:00:00.000").unwrap();
        let spaced = parse_timestamp("2023-07-04 14:00:00").unwrap();
        let portal = parse_timestamp("07/04/2023 02:00:00 PM").unwrap();
        assert_eq!(iso, spaced);
        assert_eq!(iso, portal);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("not a time").is_err());
    }

    #[test]
    fn weekday_flag_clears_on_weekends() {
        // 2023-07-04 was a Tuesday, 2023-07-08 a Saturday.
        let tuesday = parse_timestamp("2023-07-04 09:00:00").unwrap();
        let saturday = parse_timestamp("2023-07-08 09:00:00").unwrap();
        assert!(calendar_features(&tuesday).weekday);
        assert!(!calendar_features(&saturday).weekday);
    }

    #[test]
    fn features_carry_year_month_season() {
        let dt = parse_timestamp("2024-01-15 05:00:00").unwrap();
        let features = calendar_features(&dt);
        assert_eq!(features.year, 2024);
        assert_eq!(features.month, 1);
        assert_eq!(features.season, Season::Winter);
    }
}
