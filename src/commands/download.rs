use anyhow::Result;

use crate::cli::{Cli, DownloadArgs};
use crate::download::{fetch_hourly_ridership, HOURLY_RIDERSHIP_URL};

pub fn run(cli: &Cli, args: &DownloadArgs) -> Result<()> {
    let report = fetch_hourly_ridership(HOURLY_RIDERSHIP_URL, &args.out, args.max_batches, cli.verbose)?;

    println!(
        "Downloaded {} records in {} chunks into {}",
        report.records,
        report.chunks,
        args.out.display()
    );
    if !report.failed_offsets.is_empty() {
        eprintln!(
            "{} pages failed; offsets recorded in failed_offsets.txt for retry",
            report.failed_offsets.len()
        );
    }
    Ok(())
}
