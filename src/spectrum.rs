use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// One-sided amplitude spectrum of a row of pixels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// frequency axis in cycles per pixel, `k/N` for `k` in `0..=N/2`
    pub frequencies: Vec<f64>,
    /// modulus of the Fourier coefficients
    pub magnitude: Vec<f64>,
}
impl Spectrum {
    /// Spectrum of a single row, the FFT is planned for this row only
    pub fn from_row(row: &[f64]) -> Self {
        RowAnalyzer::new(row.len()).spectrum(row)
    }
    pub fn len(&self) -> usize {
        self.magnitude.len()
    }
    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }
}

/// Real-input FFT planned once for a given row length
#[derive(Clone)]
pub struct RowAnalyzer {
    sample_size: usize,
    fft: Option<Arc<dyn Fft<f64>>>,
}
impl RowAnalyzer {
    pub fn new(sample_size: usize) -> Self {
        let fft = if sample_size > 0 {
            let mut planner = FftPlanner::new();
            Some(planner.plan_fft_forward(sample_size))
        } else {
            None
        };
        Self { sample_size, fft }
    }
    /// Number of pixels per row
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
    /// Number of bins of the one-sided spectrum
    pub fn n_bins(&self) -> usize {
        if self.sample_size == 0 {
            0
        } else {
            self.sample_size / 2 + 1
        }
    }
    /// Computes the one-sided spectrum of `row`
    ///
    /// # Panics
    /// If the row length differs from the planned sample size
    pub fn spectrum(&self, row: &[f64]) -> Spectrum {
        assert_eq!(
            row.len(),
            self.sample_size,
            "row length do not match the FFT plan"
        );
        let Some(fft) = &self.fft else {
            return Spectrum::default();
        };
        let mut buffer: Vec<Complex<f64>> = row.iter().map(|&x| Complex::new(x, 0f64)).collect();
        fft.process(&mut buffer);
        let n = self.sample_size as f64;
        let (frequencies, magnitude) = buffer
            .iter()
            .take(self.n_bins())
            .enumerate()
            .map(|(k, c)| (k as f64 / n, c.norm()))
            .unzip();
        Spectrum {
            frequencies,
            magnitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn argmax(x: &[f64]) -> usize {
        x.iter()
            .enumerate()
            .skip(1)
            .fold((0, f64::NEG_INFINITY), |(i, m), (j, &v)| {
                if v > m {
                    (j, v)
                } else {
                    (i, m)
                }
            })
            .0
    }

    #[test]
    fn frequency_axis() {
        for n in [7usize, 8, 255, 256] {
            let spectrum = Spectrum::from_row(&vec![1f64; n]);
            assert_eq!(spectrum.len(), n / 2 + 1);
            spectrum
                .frequencies
                .iter()
                .enumerate()
                .for_each(|(k, f)| assert_relative_eq!(*f, k as f64 / n as f64));
        }
    }

    #[test]
    fn constant_row_is_dc_only() {
        let spectrum = Spectrum::from_row(&[3f64; 16]);
        assert_relative_eq!(spectrum.magnitude[0], 48f64, epsilon = 1e-9);
        assert!(spectrum.magnitude[1..].iter().all(|m| *m < 1e-9));
    }

    #[test]
    fn sine_peak() {
        let n = 300;
        for f0 in [0.05f64, 0.123, 0.31] {
            let row: Vec<f64> = (0..n)
                .map(|t| (2f64 * PI * f0 * t as f64).sin())
                .collect();
            let spectrum = Spectrum::from_row(&row);
            let expected = (f0 * n as f64).round() as i64;
            let k = argmax(&spectrum.magnitude) as i64;
            assert!((k - expected).abs() <= 1, "{k} vs {expected}");
        }
    }

    #[test]
    fn empty_row() {
        assert!(Spectrum::from_row(&[]).is_empty());
    }
}
