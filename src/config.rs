use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

/// Running-average window used when the window entry is left empty.
pub const DEFAULT_WINDOW_SIZE: usize = 1000;

/// Window pre-filled into the entry when running average is switched on.
pub const INITIAL_WINDOW_SIZE: usize = 10;

/// Follow-mode re-read interval in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Command line of the viewer.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Plot molecular-dynamics energy files and their statistics")]
pub struct Args {
    /// Energy files to load (.en with a sibling .info, .csv, .json or .parquet)
    pub files: Vec<PathBuf>,

    /// Plot in the terminal instead of opening a window
    #[arg(short, long)]
    pub term: bool,

    /// Start in follow mode, re-reading the last file periodically
    #[arg(short, long)]
    pub follow: bool,

    /// Follow interval in seconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: f64,

    /// Running-average window size; enables the running average overlay
    #[arg(short, long)]
    pub window_size: Option<usize>,

    /// Quantity selected at startup
    #[arg(short, long)]
    pub quantity: Option<String>,

    /// Hide the raw data and show only the statistics
    #[arg(long)]
    pub no_data: bool,
}

impl Args {
    /// Validated follow interval.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        interval_from_secs(self.interval)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("'{0}' is not a valid window size")]
    InvalidWindowSize(String),

    #[error("'{0}' is not a valid interval, expected a positive number of seconds")]
    InvalidInterval(String),
}

/// Parse the window-size entry. Empty text selects [`DEFAULT_WINDOW_SIZE`];
/// fractional values are truncated.
pub fn parse_window_size(text: &str) -> Result<usize, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(DEFAULT_WINDOW_SIZE);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value.trunc() as usize),
        _ => Err(ConfigError::InvalidWindowSize(text.to_string())),
    }
}

/// Parse the interval entry in seconds. Empty text selects
/// [`DEFAULT_INTERVAL_SECS`].
pub fn parse_interval(text: &str) -> Result<Duration, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return interval_from_secs(DEFAULT_INTERVAL_SECS);
    }
    let secs = text
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidInterval(text.to_string()))?;
    interval_from_secs(secs)
}

fn interval_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(ConfigError::InvalidInterval(secs.to_string()))
    }
}

/// Whether `text` is acceptable while typing into a numeric entry: digits
/// with at most one decimal point.
pub fn is_numeric_entry(text: &str) -> bool {
    text.chars().filter(|&c| c == '.').count() <= 1 && text.chars().all(|c| c.is_ascii_digit() || c == '.')
}
