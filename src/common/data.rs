use std::fs::File;
use std::io::{self, Seek};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use polars::{
    frame::DataFrame,
    io::{SerReader, SerWriter},
    prelude::{Column, CsvReader, CsvWriter, ParquetReader, ParquetWriter},
};
use walkdir::WalkDir;

use crate::io::{commit_artifact, open_artifact};

/// Reads a CSV file into a Polars DataFrame. Gzip-compressed chunks
/// (`.csv.gz`) are inflated to an anonymous temp file first so the reader
/// sees a plain seekable file.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        let mut decoder = GzDecoder::new(file);
        let mut inflated = tempfile::tempfile().context("create temp file for gzip inflate")?;
        io::copy(&mut decoder, &mut inflated)
            .with_context(|| format!("Failed to inflate {}", path.display()))?;
        inflated.rewind()?;
        return Ok(CsvReader::new(inflated).finish()?);
    }

    Ok(CsvReader::new(file).finish()?)
}

/// Reads every `.csv` / `.csv.gz` chunk under `dir` (sorted by name) and
/// stacks them into one DataFrame. All chunks must share a schema.
pub fn read_csv_dir(dir: &Path) -> Result<DataFrame> {
    crate::common::fs::require_dir_exists(dir)?;
    let mut chunk_paths: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            name.ends_with(".csv") || name.ends_with(".csv.gz")
        })
        .collect();
    chunk_paths.sort();

    if chunk_paths.is_empty() {
        bail!("no CSV chunks found under {}", dir.display());
    }

    let mut combined: Option<DataFrame> = None;
    for path in &chunk_paths {
        let chunk = read_csv(path)?;
        match combined.as_mut() {
            Some(df) => {
                df.vstack_mut(&chunk)
                    .with_context(|| format!("chunk schema mismatch in {}", path.display()))?;
            }
            None => combined = Some(chunk),
        }
    }
    Ok(combined.expect("at least one chunk"))
}

/// Reads a dataset that is either a single CSV file or a directory of chunks.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    if path.is_dir() { read_csv_dir(path) } else { read_csv(path) }
}

/// Writes a Polars DataFrame to a Parquet artifact (write-then-rename).
pub fn write_parquet(df: &DataFrame, path: &Path, force: bool) -> Result<()> {
    let mut pending = open_artifact(path, force)?;
    ParquetWriter::new(&mut pending).finish(&mut df.clone())?;
    commit_artifact(pending)
}

/// Reads a Polars DataFrame back from a Parquet artifact.
pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open Parquet: {}", path.display()))?;
    Ok(ParquetReader::new(file).finish()?)
}

/// Writes a Polars DataFrame to a CSV artifact (write-then-rename).
pub fn write_csv(df: &DataFrame, path: &Path, force: bool) -> Result<()> {
    let mut pending = open_artifact(path, force)?;
    CsvWriter::new(&mut pending).finish(&mut df.clone())?;
    commit_artifact(pending)
}

/// First column present in `df` out of the candidate names, cast-free.
pub fn pick_column<'a>(df: &'a DataFrame, names: &[&str]) -> Option<&'a Column> {
    names.iter().find_map(|name| df.column(name).ok())
}
