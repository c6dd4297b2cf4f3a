use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::calc::iv_statistics::CombinedTable;
use crate::util::dates::OUTPUT_DATE_FORMAT;

pub const RANK_HEADER: &str = "test_iv_rank";
pub const PERCENTILE_HEADER: &str = "test_iv_percentile";

/// Writes the comparison table as CSV to any writer.
///
/// The first header field is left blank; it labels the date index.
pub fn write_comparison<W: Write>(
    writer: W,
    columns: &[String; 3],
    table: &CombinedTable,
) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    let mut header = vec![""];
    header.extend(columns.iter().map(String::as_str));
    header.push(RANK_HEADER);
    header.push(PERCENTILE_HEADER);
    wtr.write_record(&header)?;

    for row in &table.rows {
        let obs = &row.observation;
        let mut record = vec![
            obs.date.format(OUTPUT_DATE_FORMAT).to_string(),
            obs.iv_30.to_string(),
        ];
        // Rows in the table always carry both companions.
        record.extend(
            obs.companions
                .iter()
                .map(|c| c.map(|v| v.to_string()).unwrap_or_default()),
        );
        record.push(row.iv_rank.to_string());
        record.push(row.iv_percentile.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the comparison table to `path`, creating parent directories.
pub fn write_comparison_csv(path: &Path, columns: &[String; 3], table: &CombinedTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let file = fs::File::create(path)
        .with_context(|| format!("creating output file {}", path.display()))?;
    write_comparison(file, columns, table)
        .with_context(|| format!("writing comparison rows to {}", path.display()))
}
