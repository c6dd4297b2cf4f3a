use chrono::{Duration, NaiveDate};
use std::path::Path;

/// File stems of daily snapshots look like `20231231`.
pub const SNAPSHOT_STEM_FORMAT: &str = "%Y%m%d";

/// Output date format of the comparison file.
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses the trading date encoded in a snapshot file name.
pub fn parse_stem_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, SNAPSHOT_STEM_FORMAT).ok()
}

/// A snapshot written on day `d` carries the reading for `d + 1`.
pub fn observation_date(stem_date: NaiveDate) -> Option<NaiveDate> {
    stem_date.checked_add_signed(Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn stem_date_is_shifted_one_day() {
        let path = PathBuf::from("/data/aapl/20231231.csv");
        let stem = parse_stem_date(&path).unwrap();
        assert_eq!(stem, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(
            observation_date(stem),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
    }

    #[test]
    fn non_date_stems_are_rejected() {
        assert!(parse_stem_date(&PathBuf::from("latest.csv")).is_none());
        assert!(parse_stem_date(&PathBuf::from("20241341.csv")).is_none());
    }
}
