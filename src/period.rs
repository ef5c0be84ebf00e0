//! Conversion of spectrum peaks into grating periods

use crate::{peaks::PeakSet, spectrum::Spectrum};

/// Frequencies and periods of the selected peaks of one row, by rank
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowResult {
    /// FFT bin frequency in cycles per pixel
    pub frequencies: Vec<f64>,
    /// grating period in nm
    pub periods_nm: Vec<f64>,
}
impl RowResult {
    pub fn len(&self) -> usize {
        self.periods_nm.len()
    }
    pub fn is_empty(&self) -> bool {
        self.periods_nm.is_empty()
    }
}

/// Spatial frequency in cycles per micrometer of the FFT bin `index`
pub fn spatial_frequency(index: usize, micrometers_per_pixel: f64, sample_size: usize) -> f64 {
    index as f64 / (micrometers_per_pixel * sample_size as f64)
}

/// Period in nm of the FFT bin `index`
pub fn period_nm(index: usize, micrometers_per_pixel: f64, sample_size: usize) -> f64 {
    1e3 / spatial_frequency(index, micrometers_per_pixel, sample_size)
}

/// Converts the peaks of a row spectrum into frequencies and periods
///
/// The peak set never holds the zero frequency bin, see [`select_peaks`](crate::peaks::select_peaks).
pub fn convert(
    peaks: &PeakSet,
    spectrum: &Spectrum,
    micrometers_per_pixel: f64,
    sample_size: usize,
) -> RowResult {
    let (frequencies, periods_nm) = peaks
        .iter()
        .map(|&index| {
            (
                spectrum.frequencies[index],
                period_nm(index, micrometers_per_pixel, sample_size),
            )
        })
        .unzip();
    RowResult {
        frequencies,
        periods_nm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::select_peaks;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn injected_period() {
        let sample_size = 512;
        let micrometers_per_pixel = 0.004;
        for period_px in [8f64, 16., 32., 64.] {
            let row: Vec<f64> = (0..sample_size)
                .map(|t| 128f64 + 100f64 * (2f64 * PI * t as f64 / period_px).sin())
                .collect();
            let spectrum = Spectrum::from_row(&row);
            let peaks = select_peaks(&spectrum.magnitude, 1);
            let result = convert(&peaks, &spectrum, micrometers_per_pixel, sample_size);
            assert_eq!(result.len(), 1);
            assert_relative_eq!(
                result.periods_nm[0],
                period_px * micrometers_per_pixel * 1e3,
                max_relative = 1e-9
            );
            assert_relative_eq!(result.frequencies[0], 1f64 / period_px, max_relative = 1e-9);
        }
    }

    #[test]
    fn empty_peak_set() {
        let spectrum = Spectrum::from_row(&[0f64; 8]);
        let result = convert(&PeakSet::default(), &spectrum, 1f64, 8);
        assert!(result.is_empty());
    }
}
