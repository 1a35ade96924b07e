use std::{collections::BTreeMap, fs::File, io::{BufReader, Read}, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::io::{commit_artifact, open_artifact};

/// Per-run accounting of everything the pipeline dropped, rejected, or
/// imputed, plus digests of the input snapshots it consumed. Written next
/// to the artifacts so a run is auditable after the fact.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSummary {
    /// Map-extract records dropped for missing or non-finite coordinates.
    pub stations_dropped_missing_coords: u64,
    /// Station names no resolver strategy could match; excluded from joins.
    pub station_names_unmatched: u64,
    /// Rows rejected for out-of-range values (negative counts, bad timestamps).
    pub rows_rejected_out_of_range: u64,
    /// Demographic rows rejected because proportions do not sum to 1.
    pub rows_rejected_bad_proportions: u64,
    /// Catchments with no positive-area tract overlap.
    pub catchments_without_tract_overlap: u64,
    /// Missing values filled with the column median.
    pub values_imputed: u64,
    /// Street-network segment counts by category, from the map extract.
    pub street_segments: BTreeMap<String, u64>,
    /// SHA-256 digests of consumed input files, keyed by input label.
    pub input_digests: BTreeMap<String, String>,
}

impl RunSummary {
    /// Load an existing summary, or start a fresh one if none exists yet.
    /// Stages own disjoint counters, so a later stage updating the file
    /// never disturbs an earlier stage's numbers.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open run summary: {}", path.display()))?;
        Ok(serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse run summary: {}", path.display()))?)
    }

    /// Record the SHA-256 digest of an input snapshot under `label`.
    pub fn record_input(&mut self, label: &str, path: &Path) -> Result<()> {
        self.input_digests.insert(label.to_string(), sha256_file(path)?);
        Ok(())
    }

    /// Persist the summary as pretty JSON (write-then-rename).
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut pending = open_artifact(path, true)?;
        serde_json::to_writer_pretty(&mut pending, self)?;
        commit_artifact(pending)
    }
}

/// Streaming SHA-256 of a file, hex-encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open input for digest: {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_is_stable_for_same_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "station,entries").unwrap();
        let first = sha256_file(&path).unwrap();
        let second = sha256_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_summary.json");
        let mut summary = RunSummary::default();
        summary.station_names_unmatched = 3;
        summary.street_segments.insert("residential".into(), 120);
        summary.write_json(&path).unwrap();

        let loaded = RunSummary::load_or_default(&path).unwrap();
        assert_eq!(loaded.station_names_unmatched, 3);
        assert_eq!(loaded.street_segments.get("residential"), Some(&120));
    }
}
