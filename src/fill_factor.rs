//! Grating line widths and fill factor
//!
//! Each row is split into runs of pixels above its mean intensity, the lines,
//! and runs below it, the spaces. Run lengths further than [`OUTLIER_SIGMAS`]
//! standard deviations from the row average are discarded. The fill factor is
//! the average line width over the grating period.

use crate::{
    roi::Roi,
    stats::{self, StatsError},
};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Run lengths outlier rejection threshold in standard deviations
pub const OUTLIER_SIGMAS: f64 = 2f64;

#[derive(Debug, thiserror::Error)]
pub enum FillFactorError {
    #[error("fill factor of a grating period of {0}nm")]
    Period(f64),
    #[error("line widths statistics error")]
    Stats(#[from] StatsError),
}
type Result<T> = std::result::Result<T, FillFactorError>;

/// Run lengths in pixels of a row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Runs {
    /// runs above the row mean
    pub lines: Vec<usize>,
    /// runs below the row mean
    pub spaces: Vec<usize>,
}
impl Runs {
    /// Pixels equal to the row mean end a run without starting one
    pub fn from_row(row: &[f64]) -> Self {
        let Ok(mean) = stats::mean(row) else {
            return Default::default();
        };
        let mut runs = Self::default();
        for (length, side) in row.iter().map(|v| v.partial_cmp(&mean)).dedup_with_count() {
            match side {
                Some(Ordering::Greater) => runs.lines.push(length),
                Some(Ordering::Less) => runs.spaces.push(length),
                _ => (),
            }
        }
        runs
    }
    /// Average line and space lengths without the outliers, NaN if there are none
    pub fn mean_lengths(&self) -> (f64, f64) {
        let mean = |runs: &[usize]| {
            let lengths: Vec<f64> = runs.iter().map(|&n| n as f64).collect();
            stats::mean(&stats::remove_outliers(&lengths, OUTLIER_SIGMAS)).unwrap_or(f64::NAN)
        };
        (mean(&self.lines), mean(&self.spaces))
    }
}

/// Average line and space widths of a region of interest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineWidths {
    #[serde(rename = "Line Width")]
    pub line_width_nm: f64,
    #[serde(rename = "Line Width Error")]
    pub line_width_error_nm: f64,
    #[serde(rename = "Space Width")]
    pub space_width_nm: f64,
    #[serde(rename = "Space Width Error")]
    pub space_width_error_nm: f64,
}
impl LineWidths {
    /// Row averages of the line and space widths with their standard errors
    ///
    /// Rows without lines or spaces are ignored.
    pub fn measure(roi: &Roi, micrometers_per_pixel: f64) -> Result<Self> {
        let (lines, spaces): (Vec<f64>, Vec<f64>) = roi
            .par_iter()
            .map(|row| Runs::from_row(row).mean_lengths())
            .unzip();
        let nm_per_pixel = micrometers_per_pixel * 1e3;
        let (line, line_error) = stats::nan_mean_and_error(&lines)?;
        let (space, space_error) = stats::nan_mean_and_error(&spaces)?;
        Ok(Self {
            line_width_nm: line * nm_per_pixel,
            line_width_error_nm: line_error * nm_per_pixel,
            space_width_nm: space * nm_per_pixel,
            space_width_error_nm: space_error * nm_per_pixel,
        })
    }
    /// Ratio of the line width to `grating_period_nm`
    pub fn fill_factor(&self, grating_period_nm: f64) -> Result<FillFactor> {
        if !(grating_period_nm.is_finite() && grating_period_nm > 0f64) {
            return Err(FillFactorError::Period(grating_period_nm));
        }
        Ok(FillFactor {
            fill_factor: self.line_width_nm / grating_period_nm,
            fill_factor_error: self.line_width_error_nm / grating_period_nm,
            widths: *self,
        })
    }
}

/// Grating fill factor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillFactor {
    #[serde(rename = "Fill Factor")]
    pub fill_factor: f64,
    #[serde(rename = "Fill Factor Error")]
    pub fill_factor_error: f64,
    #[serde(flatten)]
    pub widths: LineWidths,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::square_grating;
    use approx::assert_relative_eq;

    #[test]
    fn run_lengths() {
        let runs = Runs::from_row(&[1f64, 5., 5., 1., 1., 5.]);
        assert_eq!(runs.lines, vec![2, 1]);
        assert_eq!(runs.spaces, vec![1, 2]);
        let runs = Runs::from_row(&[1f64, 3., 5.]);
        assert_eq!(runs.lines, vec![1]);
        assert_eq!(runs.spaces, vec![1]);
        assert_eq!(Runs::from_row(&[]), Runs::default());
        assert!(Runs::from_row(&[2f64; 8]).lines.is_empty());
    }

    #[test]
    fn half_duty_cycle() {
        // 8px lines every 16px at 20nm per pixel
        let roi = square_grating(20, 128, 16);
        let widths = LineWidths::measure(&roi, 0.02).unwrap();
        assert_relative_eq!(widths.line_width_nm, 160f64, max_relative = 1e-9);
        assert_relative_eq!(widths.space_width_nm, 160f64, max_relative = 1e-9);
        let fill_factor = widths.fill_factor(320f64).unwrap();
        assert_relative_eq!(fill_factor.fill_factor, 0.5, max_relative = 1e-9);
        assert_relative_eq!(fill_factor.fill_factor_error, 0f64, epsilon = 1e-12);
    }

    #[test]
    fn truncated_edge_run() {
        // the first line is cut to 4px by the region edge
        let row: Vec<f64> = (4..128)
            .map(|u| if u % 16 < 8 { 200f64 } else { 40f64 })
            .collect();
        let runs = Runs::from_row(&row);
        assert_eq!(runs.lines[0], 4);
        assert_eq!(runs.lines.len(), 8);
        let (line, space) = runs.mean_lengths();
        assert_relative_eq!(line, 8f64);
        assert_relative_eq!(space, 8f64);
    }

    #[test]
    fn invalid() {
        let widths = LineWidths::measure(&square_grating(4, 64, 8), 1f64).unwrap();
        assert!(matches!(widths.fill_factor(0f64), Err(FillFactorError::Period(_))));
        assert!(matches!(
            LineWidths::measure(&square_grating(1, 64, 8), 1f64),
            Err(FillFactorError::Stats(StatsError::TooFewSamples(1)))
        ));
        let flat = Roi::try_from(vec![vec![7f64; 16]; 4]).unwrap();
        assert!(matches!(
            LineWidths::measure(&flat, 1f64),
            Err(FillFactorError::Stats(StatsError::Empty))
        ));
    }

    #[test]
    fn json_fields() {
        let widths = LineWidths::measure(&square_grating(4, 64, 8), 0.01).unwrap();
        let value = serde_json::to_value(widths.fill_factor(80f64).unwrap()).unwrap();
        assert_relative_eq!(value["Fill Factor"].as_f64().unwrap(), 0.5);
        assert_relative_eq!(value["Line Width"].as_f64().unwrap(), 40f64);
        assert!(value.get("Space Width Error").is_some());
    }
}
