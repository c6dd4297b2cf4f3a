use anyhow::{Context, Result};
use env_logger::Env;
use log::{info, warn};

mod calc;
mod config;
mod data;
mod util;

use crate::calc::iv_statistics::{calculate_iv_percentile, calculate_iv_rank, combine};
use crate::config::Config;
use crate::data::output::write_comparison_csv;
use crate::data::snapshot::{load_series, SnapshotSchema};

#[cfg(test)]
mod main_test; // Include the test module only during testing

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub files_seen: usize,
    pub files_skipped: usize,
    pub observations: usize,
    pub rows_written: usize,
    pub rows_dropped: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    let summary = run(&config)?;

    info!(
        "{} files seen, {} skipped, {} observations, {} rows written to {} ({} without full window or values)",
        summary.files_seen,
        summary.files_skipped,
        summary.observations,
        summary.rows_written,
        config.output_path.display(),
        summary.rows_dropped,
    );

    Ok(())
}

/// Builds the series from the snapshot directory and writes the comparison file.
pub fn run(config: &Config) -> Result<RunSummary> {
    let schema = SnapshotSchema::default();

    let load = load_series(&config.input_dir, &schema)
        .with_context(|| format!("listing snapshots in {}", config.input_dir.display()))?;

    for (path, err) in &load.skipped {
        warn!("skipping {}: {}", path.display(), err);
    }

    let columns = load.columns.clone().with_context(|| {
        format!("no usable snapshot files in {}", config.input_dir.display())
    })?;

    let series = &load.observations;
    let ranks = calculate_iv_rank(series, config.lookback_window);
    let percentiles = calculate_iv_percentile(series, config.lookback_window);
    let table = combine(series, &ranks, &percentiles);

    write_comparison_csv(&config.output_path, &columns, &table)?;

    Ok(RunSummary {
        files_seen: load.files_seen,
        files_skipped: load.skipped.len(),
        observations: series.len(),
        rows_written: table.rows.len(),
        rows_dropped: table.dropped,
    })
}
