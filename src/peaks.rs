//! Spectrum peak selection by topographic prominence

use std::ops::Deref;

/// A local maximum of a spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub prominence: f64,
}

/// Indices of the selected peaks, most prominent first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSet(Vec<usize>);
impl Deref for PeakSet {
    type Target = Vec<usize>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<PeakSet> for Vec<usize> {
    fn from(peaks: PeakSet) -> Self {
        peaks.0
    }
}

/// Indices of the samples strictly greater than both neighbours
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    x.windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

/// Prominence of the sample at `peak`
///
/// Walks away from the peak on each side until a higher sample or the edge
/// is reached; the base is the higher of the two minima met on the walks.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];
    let left_min = x[..peak]
        .iter()
        .rev()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    let right_min = x[peak + 1..]
        .iter()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    height - left_min.max(right_min)
}

/// Local maxima with their prominences, in detection order
pub fn find_peaks(x: &[f64]) -> Vec<Peak> {
    local_maxima(x)
        .into_iter()
        .map(|index| Peak {
            index,
            prominence: prominence(x, index),
        })
        .collect()
}

/// Selects up to `num_peaks` peaks of `magnitude` ordered by descending prominence
///
/// Equal prominences keep the detection order. The zero frequency bin is never
/// selected.
pub fn select_peaks(magnitude: &[f64], num_peaks: usize) -> PeakSet {
    let mut peaks: Vec<Peak> = find_peaks(magnitude)
        .into_iter()
        .filter(|p| p.index > 0)
        .collect();
    peaks.sort_by(|a, b| b.prominence.total_cmp(&a.prominence));
    PeakSet(peaks.into_iter().take(num_peaks).map(|p| p.index).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_maximum() {
        let mut x = vec![1f64; 64];
        x[17] = 10f64;
        for k in 1..6 {
            assert_eq!(*select_peaks(&x, k), vec![17]);
        }
    }

    #[test]
    fn edges_are_not_peaks() {
        let x = [5f64, 1., 2., 1., 6.];
        assert_eq!(local_maxima(&x), vec![2]);
    }

    #[test]
    fn plateau_is_not_a_peak() {
        let x = [0f64, 2., 2., 0.];
        assert!(local_maxima(&x).is_empty());
        assert!(select_peaks(&x, 3).is_empty());
    }

    #[test]
    fn prominences() {
        //          0   1   2   3   4   5   6   7   8
        let x = [0f64, 5., 1., 3., 2., 8., 0., 4., 1.];
        let peaks = find_peaks(&x);
        let indices: Vec<_> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 3, 5, 7]);
        // left walk hits the edge at 0, right walk stops at 8: base = max(0, 1)
        assert_relative_eq!(peaks[0].prominence, 4f64);
        // bounded by 5 on the left and 8 on the right: base = max(1, 2)
        assert_relative_eq!(peaks[1].prominence, 1f64);
        // highest sample: both walks reach the edges
        assert_relative_eq!(peaks[2].prominence, 8f64);
        // bounded by 8 on the left: base = max(0, 1)
        assert_relative_eq!(peaks[3].prominence, 3f64);
        assert_eq!(*select_peaks(&x, 3), vec![5, 1, 7]);
        assert_eq!(*select_peaks(&x, 10), vec![5, 1, 7, 3]);
    }

    #[test]
    fn ties_keep_detection_order() {
        let x = [0f64, 2., 0., 2., 0., 2., 0.];
        assert_eq!(*select_peaks(&x, 2), vec![1, 3]);
    }

    #[test]
    fn starved_spectrum() {
        assert!(select_peaks(&[], 3).is_empty());
        assert!(select_peaks(&[1f64, 2.], 3).is_empty());
        assert!(select_peaks(&[3f64, 2., 1., 0.], 3).is_empty());
    }
}
