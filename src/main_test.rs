use super::run;
use crate::config::Config;
use chrono::{Duration, NaiveDate};
use std::fs;
use std::path::Path;

const HEADER: &str = "#expiry,strike,right,open,high,low,close,volume,open_interest,implied_volatility,delta,gamma,vega,theta,iv_30,iv_rank,iv_percentile";

fn write_snapshot(dir: &Path, stem: NaiveDate, iv: f64) {
    let path = dir.join(format!("{}.csv", stem.format("%Y%m%d")));
    let body = format!(
        "{}\n20240119,150,C,1,1,1,1,10,100,0.2,0.5,0.1,0.1,-0.1,0.9,1,1\n20240119,155,C,1,1,1,1,10,100,0.2,0.5,0.1,0.1,-0.1,{},50,50\n",
        HEADER, iv
    );
    fs::write(path, body).unwrap();
}

#[test]
fn test_run_writes_one_row_per_full_window() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let first = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();

    for i in 0..300 {
        let iv = 0.15 + (i % 23) as f64 / 100.0;
        write_snapshot(input.path(), first + Duration::days(i), iv);
    }
    fs::write(input.path().join("20230615.csv"), "broken").unwrap();

    let config = Config {
        input_dir: input.path().to_path_buf(),
        output_path: output.path().join("aapl").join("generated_samples.csv"),
        lookback_window: 252,
    };
    let summary = run(&config).unwrap();

    // 20230615.csv is overwritten in place by the broken file, so one day is lost
    assert_eq!(summary.files_seen, 300);
    assert_eq!(summary.files_skipped, 1);
    assert_eq!(summary.observations, 299);
    assert_eq!(summary.rows_written, 299 - 251);

    let text = fs::read_to_string(&config.output_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some(",iv_30,iv_rank,iv_percentile,test_iv_rank,test_iv_percentile")
    );
    assert_eq!(text.lines().count(), summary.rows_written + 1);

    // Last snapshot file is dated 2023-10-26; its row is dated the day after
    let last = text.lines().last().unwrap();
    assert!(last.starts_with("2023-10-27,"), "last row: {}", last);
    assert!(last.contains(",50,50,"));
}

#[test]
fn test_run_without_snapshots_fails() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let config = Config {
        input_dir: input.path().to_path_buf(),
        output_path: output.path().join("out.csv"),
        lookback_window: 252,
    };
    assert!(run(&config).is_err());
}
