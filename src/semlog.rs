//! SEM instrument log
//!
//! The log is a text file with one `KEY value1 value2 ...` entry per line,
//! entries may be prefixed with a `$` marker.

use crate::calibration::{parse_marker, Calibration, CalibrationError, DistanceUnit};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Debug, thiserror::Error)]
pub enum SemLogError {
    #[error("failed to read SEM log {1:?}")]
    Read(#[source] io::Error, PathBuf),
    #[error(r#"SEM log entry "{0}" is missing"#)]
    MissingKey(String),
    #[error(r#"SEM log entry "{key}" has invalid value "{value}""#)]
    Value { key: String, value: String },
    #[error("SEM log calibration error")]
    Calibration(#[from] CalibrationError),
}
type Result<T> = std::result::Result<T, SemLogError>;

/// Key-value entries of a SEM log
#[derive(Debug, Default, Clone)]
pub struct SemLog(BTreeMap<String, Vec<String>>);
impl FromStr for SemLog {
    type Err = SemLogError;

    fn from_str(contents: &str) -> Result<Self> {
        Ok(Self(
            contents
                .lines()
                .map(|line| line.replace('$', ""))
                .filter_map(|line| {
                    let mut items = line.split_whitespace().map(|s| s.to_string());
                    items.next().map(|key| (key, items.collect()))
                })
                .collect(),
        ))
    }
}
impl SemLog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading {:?}...", path);
        let contents =
            fs::read_to_string(path).map_err(|e| SemLogError::Read(e, path.to_path_buf()))?;
        contents.parse()
    }
    /// Values of the entry `key`
    pub fn get(&self, key: &str) -> Result<&[String]> {
        self.0
            .get(key)
            .map(|v| v.as_slice())
            .ok_or_else(|| SemLogError::MissingKey(key.to_string()))
    }
    /// Parses the `nth` value of the entry `key`
    pub fn value<T: FromStr>(&self, key: &str, nth: usize) -> Result<T> {
        let values = self.get(key)?;
        let value = values
            .get(nth)
            .ok_or_else(|| SemLogError::MissingKey(format!("{key}[{nth}]")))?;
        value.parse::<T>().map_err(|_| SemLogError::Value {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// SEM acquisition parameters required by the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemParameters {
    pub acceleration_voltage: f64,
    pub brightness: i64,
    pub calibration_number_of_pixels: u32,
    pub contrast: i64,
    pub emission_current: f64,
    pub magnification: u64,
    pub working_distance: f64,
    pub image_width: usize,
    pub image_height: usize,
    pub calibration_distance_value: u32,
    pub calibration_distance_unit: DistanceUnit,
}
impl TryFrom<&SemLog> for SemParameters {
    type Error = SemLogError;

    fn try_from(log: &SemLog) -> Result<Self> {
        let (calibration_distance_value, calibration_distance_unit) =
            parse_marker(log.get("SM_MICRON_MARKER")?.first().map_or("", |s| s.as_str()))?;
        // CM_FULL_SIZE is [width, height]
        Ok(Self {
            acceleration_voltage: log.value("CM_ACCEL_VOLT", 0)?,
            brightness: log.value("CM_BRIGHTNESS", 0)?,
            calibration_number_of_pixels: log.value("SM_MICRON_BAR", 0)?,
            contrast: log.value("CM_CONTRAST", 0)?,
            emission_current: log.value("SM_EMI_CURRENT", 0)?,
            magnification: log.value("CM_MAG", 0)?,
            working_distance: log.value("SM_WD", 0)?,
            image_width: log.value("CM_FULL_SIZE", 0)?,
            image_height: log.value("CM_FULL_SIZE", 1)?,
            calibration_distance_value,
            calibration_distance_unit,
        })
    }
}
impl SemParameters {
    /// Reads the parameters from a SEM log file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::try_from(&SemLog::load(path)?)
    }
    pub fn calibration(&self) -> Result<Calibration> {
        Ok(Calibration::new(
            self.calibration_distance_value as f64,
            self.calibration_distance_unit,
            self.calibration_number_of_pixels,
        )?)
    }
}
