use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::dates::{observation_date, parse_stem_date};

/// Positional layout of a daily option-universe snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSchema {
    pub iv_index: usize,
    pub iv_header: String,
    /// Columns after the IV reading copied through to the output unchanged.
    pub companion_indices: [usize; 2],
}

impl Default for SnapshotSchema {
    fn default() -> Self {
        SnapshotSchema {
            iv_index: 14,
            iv_header: "iv_30".to_string(),
            companion_indices: [15, 16],
        }
    }
}

impl SnapshotSchema {
    fn min_fields(&self) -> usize {
        self.companion_indices
            .iter()
            .copied()
            .chain(std::iter::once(self.iv_index))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Checks a header row against the layout and returns the names of the
    /// IV column followed by the companion columns.
    pub fn validate(&self, headers: &StringRecord) -> Result<[String; 3], ParseError> {
        if headers.len() < self.min_fields() {
            return Err(ParseError::Schema(format!(
                "expected at least {} columns, found {}",
                self.min_fields(),
                headers.len()
            )));
        }

        let iv_name = headers[self.iv_index].trim();
        if iv_name != self.iv_header {
            return Err(ParseError::Schema(format!(
                "column {} is '{}', expected '{}'",
                self.iv_index, iv_name, self.iv_header
            )));
        }

        let [a, b] = self.companion_indices;
        Ok([
            iv_name.to_string(),
            headers[a].trim().to_string(),
            headers[b].trim().to_string(),
        ])
    }
}

/// Why a snapshot file was left out of the series.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("file name is not a YYYYMMDD date")]
    FileName,

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected layout: {0}")]
    Schema(String),

    #[error("no data rows")]
    Empty,

    #[error("column '{column}' holds '{value}', not a finite number")]
    InvalidNumber { column: String, value: String },
}

/// The last reading of one daily snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub iv_30: f64,
    pub companions: [Option<f64>; 2],
}

impl Observation {
    pub fn new(date: NaiveDate, iv_30: f64, companions: [Option<f64>; 2]) -> Self {
        Observation {
            date,
            iv_30,
            companions,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.companions.iter().all(Option::is_some)
    }
}

fn parse_cell(record: &StringRecord, index: usize, column: &str) -> Result<Option<f64>, ParseError> {
    let raw = record.get(index).map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ParseError::InvalidNumber {
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// One parsed snapshot file.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub observation: Observation,
    /// Header names of the IV column and the two companion columns.
    pub columns: [String; 3],
}

/// Reads the header and the final row of one snapshot file.
pub fn read_snapshot(path: &Path, schema: &SnapshotSchema) -> Result<Snapshot, ParseError> {
    let date = parse_stem_date(path)
        .and_then(observation_date)
        .ok_or(ParseError::FileName)?;

    let file = File::open(path)?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = rdr.headers()?.clone();
    let columns = schema.validate(&headers)?;
    let [iv_name, first_name, second_name] = &columns;

    let mut last = None;
    for result in rdr.records() {
        last = Some(result?);
    }
    let record = last.ok_or(ParseError::Empty)?;

    let iv_30 = parse_cell(&record, schema.iv_index, iv_name)?.ok_or_else(|| {
        ParseError::InvalidNumber {
            column: iv_name.clone(),
            value: String::new(),
        }
    })?;

    let [a, b] = schema.companion_indices;
    let companions = [
        parse_cell(&record, a, first_name)?,
        parse_cell(&record, b, second_name)?,
    ];

    Ok(Snapshot {
        observation: Observation::new(date, iv_30, companions),
        columns,
    })
}

/// Series assembled from a snapshot directory plus the files that were skipped.
#[derive(Debug, Default)]
pub struct SeriesLoad {
    pub observations: Vec<Observation>,
    pub skipped: Vec<(PathBuf, ParseError)>,
    pub files_seen: usize,
    /// Header names of the IV and companion columns, taken from the first
    /// file that loaded.
    pub columns: Option<[String; 3]>,
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
}

/// Reads every `*.csv` in `dir` and returns the observations in date order.
///
/// Malformed files are collected in `skipped` rather than failing the load.
pub fn load_series(dir: &Path, schema: &SnapshotSchema) -> std::io::Result<SeriesLoad> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| is_csv(p))
        .collect();
    paths.sort();

    let mut load = SeriesLoad {
        files_seen: paths.len(),
        ..SeriesLoad::default()
    };

    for path in paths {
        let result = read_snapshot(&path, schema).and_then(|snapshot| {
            match &load.columns {
                Some(expected) if *expected != snapshot.columns => {
                    Err(ParseError::Schema(format!(
                        "columns {:?} differ from {:?}",
                        snapshot.columns, expected
                    )))
                }
                Some(_) => Ok(snapshot.observation),
                None => {
                    load.columns = Some(snapshot.columns);
                    Ok(snapshot.observation)
                }
            }
        });

        match result {
            Ok(obs) => {
                debug!("{}: {} iv_30={}", path.display(), obs.date, obs.iv_30);
                load.observations.push(obs);
            }
            Err(e) => load.skipped.push((path, e)),
        }
    }

    // Stable sort keeps the earliest file name first among same-date entries.
    load.observations.sort_by_key(|obs| obs.date);
    let before = load.observations.len();
    load.observations.dedup_by_key(|obs| obs.date);
    if load.observations.len() < before {
        warn!(
            "{} snapshot(s) mapped to an already loaded date and were ignored",
            before - load.observations.len()
        );
    }

    Ok(load)
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod snapshot_test;
