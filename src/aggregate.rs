//! Row to sample aggregation of the grating periods
//!
//! Every row of the region of interest is binarized according to the
//! threshold policy, Fourier transformed and reduced to the periods of its
//! most prominent spectrum peaks. The periods are then averaged rank by rank
//! over all the rows.

use crate::{
    peaks::select_peaks,
    period::{self, RowResult},
    roi::Roi,
    spectrum::{RowAnalyzer, Spectrum},
    stats::{self, StatsError},
    threshold::ThresholdPolicy,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("grating statistics require at least 2 rows, found {0}")]
    TooFewRows(usize),
    #[error("grating statistics error")]
    Stats(#[from] StatsError),
}
type Result<T> = std::result::Result<T, AggregateError>;

/// Sample averages and standard errors of the peak periods and frequencies, by rank
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleAggregate {
    #[serde(rename = "Average_Periods_nm")]
    pub average_periods_nm: Vec<f64>,
    #[serde(rename = "Period_Errors_nm")]
    pub period_errors_nm: Vec<f64>,
    #[serde(rename = "Average_Frequencies")]
    pub average_frequencies: Vec<f64>,
    #[serde(rename = "Frequencies_Errors")]
    pub frequency_errors: Vec<f64>,
}
impl SampleAggregate {
    /// Number of ranks
    pub fn len(&self) -> usize {
        self.average_periods_nm.len()
    }
    pub fn is_empty(&self) -> bool {
        self.average_periods_nm.is_empty()
    }
    /// Largest average period and its standard error
    pub fn max_period(&self) -> Option<(f64, f64)> {
        self.average_periods_nm
            .iter()
            .zip(&self.period_errors_nm)
            .fold(None, |max, (&p, &e)| match max {
                Some((max_p, _)) if max_p >= p => max,
                _ => Some((p, e)),
            })
    }
}

/// Row kept for inspection of the analysis
#[derive(Debug, Clone, PartialEq)]
pub struct RowDiagnostic {
    pub row_index: usize,
    /// the row after binarization
    pub row: Vec<f64>,
    pub spectrum: Spectrum,
}

/// Grating analysis results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub aggregate: SampleAggregate,
    pub diagnostics: Vec<RowDiagnostic>,
}

/// Grating period analysis of a region of interest for a given threshold policy
pub struct GratingAnalysis<'a> {
    roi: &'a Roi,
    micrometers_per_pixel: f64,
    num_peaks: usize,
    threshold: ThresholdPolicy,
    diagnostic_rows: usize,
}
impl<'a> GratingAnalysis<'a> {
    pub fn new(roi: &'a Roi, micrometers_per_pixel: f64) -> Self {
        Self {
            roi,
            micrometers_per_pixel,
            num_peaks: crate::config::NUM_PEAKS,
            threshold: ThresholdPolicy::None,
            diagnostic_rows: 0,
        }
    }
    pub fn num_peaks(self, num_peaks: usize) -> Self {
        Self { num_peaks, ..self }
    }
    pub fn threshold(self, threshold: ThresholdPolicy) -> Self {
        Self { threshold, ..self }
    }
    /// Keeps about `diagnostic_rows` evenly spaced rows for inspection
    pub fn diagnostic_rows(self, diagnostic_rows: usize) -> Self {
        Self {
            diagnostic_rows,
            ..self
        }
    }
    fn is_diagnostic(&self, row_index: usize) -> bool {
        if self.diagnostic_rows == 0 {
            return false;
        }
        let stride = (self.roi.height() / self.diagnostic_rows).max(1);
        row_index % stride == 0 && row_index / stride < self.diagnostic_rows
    }
    /// Peak frequencies and periods of each row
    pub fn row_results(&self) -> Vec<RowResult> {
        self.process().into_iter().map(|(result, _)| result).collect()
    }
    fn process(&self) -> Vec<(RowResult, Option<RowDiagnostic>)> {
        let analyzer = RowAnalyzer::new(self.roi.width());
        self.roi
            .par_iter()
            .enumerate()
            .map(|(row_index, raw_row)| {
                let row = self.threshold.apply(raw_row);
                let spectrum = analyzer.spectrum(&row);
                let peaks = select_peaks(&spectrum.magnitude, self.num_peaks);
                let result = period::convert(
                    &peaks,
                    &spectrum,
                    self.micrometers_per_pixel,
                    analyzer.sample_size(),
                );
                let diagnostic = self.is_diagnostic(row_index).then(|| RowDiagnostic {
                    row_index,
                    row: row.into_owned(),
                    spectrum,
                });
                (result, diagnostic)
            })
            .collect()
    }
    /// Runs the analysis
    pub fn analyse(&self) -> Result<Analysis> {
        let n_rows = self.roi.height();
        if n_rows < 2 {
            return Err(AggregateError::TooFewRows(n_rows));
        }
        log::debug!(
            "{} threshold analysis of {}x{} pixels",
            self.threshold,
            n_rows,
            self.roi.width()
        );
        let (results, diagnostics): (Vec<_>, Vec<_>) = self.process().into_iter().unzip();
        let aggregate = aggregate(&results, self.num_peaks)?;
        Ok(Analysis {
            aggregate,
            diagnostics: diagnostics.into_iter().flatten().collect(),
        })
    }
    /// Runs the analysis without diagnostics
    pub fn aggregate(&self) -> Result<SampleAggregate> {
        Ok(Self {
            diagnostic_rows: 0,
            ..*self
        }
        .analyse()?
        .aggregate)
    }
}

/// Averages the row results rank by rank
///
/// Rows with fewer peaks than `num_peaks` do not contribute to the missing
/// ranks. Ranks are kept as long as at least 2 rows contribute to them.
pub fn aggregate(results: &[RowResult], num_peaks: usize) -> Result<SampleAggregate> {
    if results.len() < 2 {
        return Err(AggregateError::TooFewRows(results.len()));
    }
    let n_short = results.iter().filter(|r| r.len() < num_peaks).count();
    if n_short > 0 {
        log::warn!(
            "{} out of {} rows have fewer than {} spectrum peaks",
            n_short,
            results.len(),
            num_peaks
        );
    }
    // NaN padded values of a given rank
    let rank_values = |rank: usize| -> (Vec<f64>, Vec<f64>) {
        results
            .iter()
            .map(|r| {
                (
                    r.periods_nm.get(rank).copied().unwrap_or(f64::NAN),
                    r.frequencies.get(rank).copied().unwrap_or(f64::NAN),
                )
            })
            .unzip()
    };
    let mut sample = SampleAggregate::default();
    for rank in 0..num_peaks {
        let (periods, frequencies) = rank_values(rank);
        if periods.iter().filter(|p| !p.is_nan()).count() < 2 {
            log::warn!("spectrum peak #{} found in less than 2 rows, dropped", rank + 1);
            break;
        }
        let (period, period_error) = stats::nan_mean_and_error(&periods)?;
        let (frequency, frequency_error) = stats::nan_mean_and_error(&frequencies)?;
        sample.average_periods_nm.push(period);
        sample.period_errors_nm.push(period_error);
        sample.average_frequencies.push(frequency);
        sample.frequency_errors.push(frequency_error);
    }
    Ok(sample)
}
