use std::io::Write;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::common::fs::ensure_dir_exists;
use crate::io::{commit_artifact, open_artifact};

/// Hourly ridership dataset on the state open-data portal (SODA API).
pub const HOURLY_RIDERSHIP_URL: &str = "https://data.ny.gov/resource/wujg-7c2s.json";

/// SODA 2.0 caps pages at 50 000 rows; stay under it.
const BATCH_SIZE: usize = 45_000;

/// Columns carried into the chunk CSVs, in output order.
const COLUMNS: &[&str] = &[
    "transit_timestamp",
    "station_complex",
    "borough",
    "ridership",
    "transfers",
    "latitude",
    "longitude",
];

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub records: u64,
    pub chunks: u32,
    pub failed_offsets: Vec<usize>,
}

/// Page through the hourly ridership dataset, writing one CSV chunk per
/// page. A failed page is recorded and skipped rather than aborting the
/// whole download; the offsets land in `failed_offsets.txt` for a retry.
pub fn fetch_hourly_ridership(
    base_url: &str,
    out_dir: &Path,
    max_batches: Option<usize>,
    verbose: u8,
) -> Result<DownloadReport> {
    ensure_dir_exists(out_dir)?;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("build HTTP client")?;

    let mut report = DownloadReport::default();
    let mut offset = 0usize;
    loop {
        if let Some(max) = max_batches {
            if report.chunks as usize + report.failed_offsets.len() >= max {
                break;
            }
        }
        if verbose > 0 {
            eprintln!("[download] offset={offset} limit={BATCH_SIZE}");
        }

        let response = client
            .get(base_url)
            .query(&[
                ("$limit", BATCH_SIZE.to_string()),
                ("$offset", offset.to_string()),
                ("$order", ":id".to_string()),
            ])
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json::<Vec<Value>>());

        let rows = match response {
            Ok(rows) => rows,
            Err(err) => {
                eprintln!("[download] offset {offset} failed: {err}");
                report.failed_offsets.push(offset);
                offset += BATCH_SIZE;
                continue;
            }
        };
        if rows.is_empty() {
            break;
        }

        report.chunks += 1;
        let chunk_path = out_dir.join(format!("ridership_chunk{:05}.csv", report.chunks));
        write_chunk(&chunk_path, &rows)?;
        report.records += rows.len() as u64;
        if verbose > 0 {
            eprintln!("[download] wrote {} rows -> {}", rows.len(), chunk_path.display());
        }

        if rows.len() < BATCH_SIZE {
            break;
        }
        offset += BATCH_SIZE;
        thread::sleep(Duration::from_secs(1)); // pacing required by the portal
    }

    if !report.failed_offsets.is_empty() {
        let mut pending = open_artifact(&out_dir.join("failed_offsets.txt"), true)?;
        for failed in &report.failed_offsets {
            writeln!(pending, "{failed}")?;
        }
        commit_artifact(pending)?;
    }

    Ok(report)
}

fn write_chunk(path: &Path, rows: &[Value]) -> Result<()> {
    let mut pending = open_artifact(path, true)?;
    writeln!(pending, "{}", COLUMNS.join(","))?;
    for row in rows {
        let fields: Vec<String> = COLUMNS.iter().map(|name| csv_field(row.get(*name))).collect();
        writeln!(pending, "{}", fields.join(","))?;
    }
    commit_artifact(pending)
}

/// Render a JSON field as a CSV cell, quoting when the content needs it.
fn csv_field(value: Option<&Value>) -> String {
    let raw = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    };
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_field_quotes_only_when_needed() {
        assert_eq!(csv_field(Some(&Value::String("CANAL ST".into()))), "CANAL ST");
        assert_eq!(
            csv_field(Some(&Value::String("TIMES SQ, 42 ST".into()))),
            "\"TIMES SQ, 42 ST\""
        );
        assert_eq!(csv_field(None), "");
    }
}
