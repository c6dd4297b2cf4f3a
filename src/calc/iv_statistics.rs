use chrono::NaiveDate;
use log::{debug, warn};
use thiserror::Error;

use crate::data::snapshot::Observation;

/// Trading days in the one-year lookback.
pub const DEFAULT_LOOKBACK_WINDOW: usize = 252;

/// Reasons a rolling statistic has no value at a given date.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StatisticError {
    #[error("only {available} of {window} observations available")]
    InsufficientHistory { available: usize, window: usize },

    #[error("window range is zero (every reading is {value})")]
    ZeroRange { value: f64 },

    #[error("window range {lo}..{hi} does not give a finite rank")]
    NonFiniteRange { lo: f64, hi: f64 },

    #[error("lookback window must hold at least one observation")]
    EmptyWindow,
}

/// One rolling statistic aligned with the date of its input observation.
pub type DatedStatistic = (NaiveDate, Result<f64, StatisticError>);

/// Returns the trailing `window` readings ending at `index` (inclusive).
fn trailing_window(
    values: &[f64],
    index: usize,
    window: usize,
) -> Result<&[f64], StatisticError> {
    if window == 0 {
        return Err(StatisticError::EmptyWindow);
    }
    let available = index + 1;
    if available < window {
        return Err(StatisticError::InsufficientHistory { available, window });
    }
    Ok(&values[available - window..available])
}

fn rolling<F>(series: &[Observation], window: usize, statistic: F) -> Vec<DatedStatistic>
where
    F: Fn(&[f64]) -> Result<f64, StatisticError>,
{
    let values: Vec<f64> = series.iter().map(|obs| obs.iv_30).collect();

    series
        .iter()
        .enumerate()
        .map(|(i, obs)| {
            let value = trailing_window(&values, i, window).and_then(&statistic);
            (obs.date, value)
        })
        .collect()
}

/// IV rank: where the latest reading sits in the window's min-max range, 0-100.
pub fn calculate_iv_rank(series: &[Observation], window: usize) -> Vec<DatedStatistic> {
    rolling(series, window, |w| {
        let current = w[w.len() - 1];
        let (lo, hi) = w
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });

        let range = hi - lo;
        if range == 0.0 {
            return Err(StatisticError::ZeroRange { value: current });
        }
        let rank = (current - lo) / range * 100.0;
        if !range.is_finite() || !rank.is_finite() {
            return Err(StatisticError::NonFiniteRange { lo, hi });
        }
        Ok(rank)
    })
}

/// IV percentile: share of window readings strictly below the latest one, 0-100.
///
/// Ties are not counted, so a flat window scores 0.
pub fn calculate_iv_percentile(series: &[Observation], window: usize) -> Vec<DatedStatistic> {
    rolling(series, window, |w| {
        let current = w[w.len() - 1];
        let below = w.iter().filter(|&&x| x < current).count();
        Ok(below as f64 / w.len() as f64 * 100.0)
    })
}

/// A fully defined output row: the observation plus both statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub observation: Observation,
    pub iv_rank: f64,
    pub iv_percentile: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    pub rows: Vec<ComparisonRow>,
    /// Input dates left out because some column had no value.
    pub dropped: usize,
}

/// Joins observations with their rank and percentile by date.
///
/// Rows missing any value (a statistic or a companion column) are dropped,
/// as are rows whose statistics are absent or carry a different date.
pub fn combine(
    series: &[Observation],
    ranks: &[DatedStatistic],
    percentiles: &[DatedStatistic],
) -> CombinedTable {
    let mut table = CombinedTable::default();

    for (i, obs) in series.iter().enumerate() {
        let (rank, pct) = match (ranks.get(i), percentiles.get(i)) {
            (Some((rank_date, rank)), Some((pct_date, pct)))
                if *rank_date == obs.date && *pct_date == obs.date =>
            {
                (rank, pct)
            }
            _ => {
                warn!("{}: no rank/percentile aligned with this date", obs.date);
                table.dropped += 1;
                continue;
            }
        };

        match (rank, pct) {
            (Ok(iv_rank), Ok(iv_percentile)) if obs.is_complete() => {
                table.rows.push(ComparisonRow {
                    observation: obs.clone(),
                    iv_rank: *iv_rank,
                    iv_percentile: *iv_percentile,
                });
            }
            (Err(StatisticError::ZeroRange { value }), _) => {
                debug!("{}: IV rank undefined, flat window at {}", obs.date, value);
                table.dropped += 1;
            }
            _ => table.dropped += 1,
        }
    }

    table
}
