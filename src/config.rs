use crate::threshold::ThresholdPolicy;
use std::{
    collections::BTreeMap,
    env::{self, VarError},
    fs, io,
    num::ParseIntError,
    path::Path,
};

/// Default number of peaks extracted from each row spectrum
pub const NUM_PEAKS: usize = 5;
/// Default number of rows kept for the diagnostic figures
pub const DIAGNOSTIC_ROWS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(r#"failed to read the "DESIGN_PERIODS" env var: {0}"#)]
    Env(#[from] VarError),
    #[error("failed to read the design periods file {1}")]
    ReadFile(#[source] io::Error, String),
    #[error(r#"design period entry "{0}" doesn't match "<key> <period>""#)]
    Entry(String),
    #[error("design period parsing error")]
    Period(#[from] ParseIntError),
    #[error(r#"number of spectrum peaks "{0}" must be a positive integer"#)]
    NumPeaks(String),
}
type Result<T> = std::result::Result<T, ConfigError>;

/// Parses a number of spectrum peaks, rejecting 0
pub fn parse_num_peaks(s: &str) -> Result<usize> {
    match s.parse::<usize>() {
        Ok(num_peaks) if num_peaks > 0 => Ok(num_peaks),
        _ => Err(ConfigError::NumPeaks(s.to_string())),
    }
}

/// Grating analysis settings
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// number of spectrum peaks per row
    pub num_peaks: usize,
    /// threshold policies tried by the optimizer, in order
    pub policies: Vec<ThresholdPolicy>,
    /// number of rows sampled for diagnostics, 0 disables diagnostics
    pub diagnostic_rows: usize,
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            num_peaks: NUM_PEAKS,
            policies: ThresholdPolicy::candidates(),
            diagnostic_rows: 0,
        }
    }
}
impl AnalysisConfig {
    pub fn num_peaks(self, num_peaks: usize) -> Self {
        Self { num_peaks, ..self }
    }
    pub fn policies(self, policies: Vec<ThresholdPolicy>) -> Self {
        Self { policies, ..self }
    }
    pub fn diagnostic_rows(self, diagnostic_rows: usize) -> Self {
        Self {
            diagnostic_rows,
            ..self
        }
    }
}

/// Nominal grating periods in nm indexed by grating design key
#[derive(Debug, Clone, PartialEq)]
pub struct DesignPeriods(BTreeMap<String, u32>);
impl Default for DesignPeriods {
    fn default() -> Self {
        Self(
            [
                ("A1", 340),
                ("A2", 405),
                ("A3", 365),
                ("A4", 440),
                ("A5", 390),
                ("A6", 475),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        )
    }
}
impl DesignPeriods {
    /// Reads the table from the file given by the env variable `DESIGN_PERIODS`
    pub fn from_env() -> Result<Self> {
        let filename = env::var("DESIGN_PERIODS")?;
        Self::from_file(filename)
    }
    /// Reads the table from a file with one `<key> <period>` entry per line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(e, path.display().to_string()))?;
        contents
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let mut items = line.split_whitespace();
                match (items.next(), items.next(), items.next()) {
                    (Some(key), Some(period), None) => Ok((key.to_string(), period.parse::<u32>()?)),
                    _ => Err(ConfigError::Entry(line.to_string())),
                }
            })
            .collect::<Result<BTreeMap<String, u32>>>()
            .map(Self)
    }
    /// `DESIGN_PERIODS` table if the env variable is set, the default table otherwise
    pub fn from_env_or_default() -> Result<Self> {
        match Self::from_env() {
            Err(ConfigError::Env(VarError::NotPresent)) => Ok(Self::default()),
            other => other,
        }
    }
    pub fn get(&self, key: &str) -> Option<u32> {
        self.0.get(key).copied()
    }
}
