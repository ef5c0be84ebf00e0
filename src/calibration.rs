use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error(r#"distance unit "{0}" is not recognized, expected "mm", "um" or "nm""#)]
    Unit(String),
    #[error("the calibration bar must span at least one pixel")]
    ZeroPixels,
    #[error(r#"calibration marker "{0}" doesn't match <integer><unit>"#)]
    Marker(String),
    #[error("invalid calibration marker regex")]
    Regex(#[from] regex::Error),
    #[error("calibration marker value parsing error")]
    Value(#[from] std::num::ParseIntError),
}
type Result<T> = std::result::Result<T, CalibrationError>;

/// Length unit of the SEM calibration bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[serde(rename = "mm")]
    Millimeter,
    #[serde(rename = "um")]
    Micrometer,
    #[serde(rename = "nm")]
    Nanometer,
}
impl DistanceUnit {
    /// Number of micrometers in one unit
    pub fn micrometers(&self) -> f64 {
        use DistanceUnit::*;
        match self {
            Millimeter => 1e3,
            Micrometer => 1f64,
            Nanometer => 1e-3,
        }
    }
}
impl FromStr for DistanceUnit {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self> {
        use DistanceUnit::*;
        match s {
            "mm" => Ok(Millimeter),
            "um" => Ok(Micrometer),
            "nm" => Ok(Nanometer),
            _ => Err(CalibrationError::Unit(s.to_string())),
        }
    }
}
impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DistanceUnit::*;
        match self {
            Millimeter => write!(f, "mm"),
            Micrometer => write!(f, "um"),
            Nanometer => write!(f, "nm"),
        }
    }
}

/// SEM scale bar: a physical distance spanning a number of pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub distance_value: f64,
    pub distance_unit: DistanceUnit,
    pub pixel_count: u32,
}
impl Calibration {
    pub fn new(distance_value: f64, distance_unit: DistanceUnit, pixel_count: u32) -> Result<Self> {
        if pixel_count == 0 {
            return Err(CalibrationError::ZeroPixels);
        }
        Ok(Self {
            distance_value,
            distance_unit,
            pixel_count,
        })
    }
    /// Calibration from the unit symbol as written in the SEM log
    pub fn from_symbol(distance_value: f64, distance_unit: &str, pixel_count: u32) -> Result<Self> {
        Self::new(distance_value, distance_unit.parse()?, pixel_count)
    }
    /// Distance covered by one pixel in micrometers
    pub fn micrometers_per_pixel(&self) -> f64 {
        self.distance_value * self.distance_unit.micrometers() / self.pixel_count as f64
    }
}

/// Splits a scale bar marker such as `500nm` into its value and unit
pub fn parse_marker(marker: &str) -> Result<(u32, DistanceUnit)> {
    let re = Regex::new(r"^(\d+)([a-zA-Z]{2})$")?;
    let capts = re
        .captures(marker.trim())
        .ok_or_else(|| CalibrationError::Marker(marker.to_string()))?;
    let value = capts[1].parse::<u32>()?;
    let unit = capts[2].parse::<DistanceUnit>()?;
    Ok((value, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nanometer_bar() {
        let calibration = Calibration::from_symbol(250f64, "nm", 100).unwrap();
        assert_relative_eq!(calibration.micrometers_per_pixel(), 0.0025, epsilon = 1e-15);
    }

    #[test]
    fn scales_with_distance_and_pixels() {
        for unit in ["mm", "um", "nm"] {
            let base = Calibration::from_symbol(100f64, unit, 50)
                .unwrap()
                .micrometers_per_pixel();
            let double_distance = Calibration::from_symbol(200f64, unit, 50)
                .unwrap()
                .micrometers_per_pixel();
            let double_pixels = Calibration::from_symbol(100f64, unit, 100)
                .unwrap()
                .micrometers_per_pixel();
            assert_relative_eq!(double_distance, 2f64 * base, max_relative = 1e-12);
            assert_relative_eq!(double_pixels, 0.5 * base, max_relative = 1e-12);
        }
    }

    #[test]
    fn unknown_unit() {
        assert!(matches!(
            Calibration::from_symbol(1f64, "pm", 10),
            Err(CalibrationError::Unit(u)) if u == "pm"
        ));
    }

    #[test]
    fn zero_pixels() {
        assert!(matches!(
            Calibration::from_symbol(1f64, "um", 0),
            Err(CalibrationError::ZeroPixels)
        ));
    }

    #[test]
    fn marker() {
        assert_eq!(parse_marker("500nm").unwrap(), (500, DistanceUnit::Nanometer));
        assert_eq!(parse_marker("1um").unwrap(), (1, DistanceUnit::Micrometer));
        assert!(matches!(
            parse_marker("nm500"),
            Err(CalibrationError::Marker(_))
        ));
        assert!(matches!(parse_marker("5xm"), Err(CalibrationError::Unit(_))));
    }
}
