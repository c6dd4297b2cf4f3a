use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::calc::iv_statistics::DEFAULT_LOOKBACK_WINDOW;

pub const DEFAULT_OUTPUT_PATH: &str = "generated_samples.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub lookback_window: usize,
}

impl Config {
    /// Loads settings from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input_dir = lookup("IV_INPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let output_path = lookup("IV_OUTPUT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH));

        let lookback_window = match lookup("IV_LOOKBACK_WINDOW") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("IV_LOOKBACK_WINDOW must be an integer, got '{}'", raw))?,
            None => DEFAULT_LOOKBACK_WINDOW,
        };
        if lookback_window == 0 {
            bail!("IV_LOOKBACK_WINDOW must be at least 1");
        }

        Ok(Config {
            input_dir,
            output_path,
            lookback_window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_constants() {
        let config = load(&[]).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("."));
        assert_eq!(config.output_path, PathBuf::from("generated_samples.csv"));
        assert_eq!(config.lookback_window, 252);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("IV_INPUT_DIR", "/data/aapl"),
            ("IV_OUTPUT_PATH", "/tmp/out.csv"),
            ("IV_LOOKBACK_WINDOW", " 20 "),
        ])
        .unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/data/aapl"));
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.csv"));
        assert_eq!(config.lookback_window, 20);
    }

    #[test]
    fn rejects_bad_windows() {
        assert!(load(&[("IV_LOOKBACK_WINDOW", "year")]).is_err());
        assert!(load(&[("IV_LOOKBACK_WINDOW", "0")]).is_err());
        assert!(load(&[("IV_LOOKBACK_WINDOW", "-5")]).is_err());
    }
}
