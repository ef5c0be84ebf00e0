//! Sample statistics
//!
//! The standard deviation is the population one (`n` denominator) and the
//! standard error of the mean is `std / sqrt(n - 1)`.

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StatsError {
    #[error("standard error of the mean requires at least 2 samples, found {0}")]
    TooFewSamples(usize),
    #[error("statistics of an empty sequence")]
    Empty,
}
type Result<T> = std::result::Result<T, StatsError>;

pub fn mean(x: &[f64]) -> Result<f64> {
    if x.is_empty() {
        return Err(StatsError::Empty);
    }
    Ok(x.iter().sum::<f64>() / x.len() as f64)
}

pub fn standard_deviation(x: &[f64]) -> Result<f64> {
    let m = mean(x)?;
    let n = x.len() as f64;
    Ok((x.iter().map(|x| x - m).fold(0f64, |s, x| s + x * x) / n).sqrt())
}

pub fn standard_error_mean(x: &[f64]) -> Result<f64> {
    if x.len() < 2 {
        return Err(StatsError::TooFewSamples(x.len()));
    }
    Ok(standard_deviation(x)? / ((x.len() - 1) as f64).sqrt())
}

/// Mean and standard error of the mean
pub fn mean_and_error(x: &[f64]) -> Result<(f64, f64)> {
    Ok((mean(x)?, standard_error_mean(x)?))
}

/// Mean and standard error of the mean ignoring NaN values
pub fn nan_mean_and_error(x: &[f64]) -> Result<(f64, f64)> {
    let finite: Vec<f64> = x.iter().cloned().filter(|x| !x.is_nan()).collect();
    mean_and_error(&finite)
}

/// Values within `n_sigma` standard deviations of the mean
pub fn remove_outliers(x: &[f64], n_sigma: f64) -> Vec<f64> {
    let (Ok(m), Ok(std)) = (mean(x), standard_deviation(x)) else {
        return vec![];
    };
    x.iter()
        .cloned()
        .filter(|x| (x - m).abs() <= n_sigma * std)
        .collect()
}
