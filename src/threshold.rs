use crate::stats;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt, str::FromStr};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Pixel value of the binarized rows above the threshold
pub const HIGH: f64 = 255f64;

#[derive(Debug, thiserror::Error)]
#[error(r#"threshold policy "{0}" is not recognized, expected "None", "Mean", "Mean+StdDev" or "Mean-StdDev""#)]
pub struct ThresholdPolicyError(String);

/// Row binarization policy
#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    #[serde(rename = "Mean")]
    Mean,
    #[serde(rename = "Mean-StdDev")]
    MeanMinusStdDev,
    #[serde(rename = "Mean+StdDev")]
    MeanPlusStdDev,
    #[serde(rename = "None")]
    None,
}
impl ThresholdPolicy {
    /// Policies in the order the optimizer entertains them
    pub fn candidates() -> Vec<Self> {
        Self::iter().collect()
    }
    /// Threshold of a row, `None` if the row is not binarized
    pub fn threshold(&self, row: &[f64]) -> Option<f64> {
        use ThresholdPolicy::*;
        let mean = || stats::mean(row).ok();
        let std = || stats::standard_deviation(row).ok();
        match self {
            None => Option::None,
            Mean => mean(),
            MeanPlusStdDev => Some(mean()? + std()?),
            MeanMinusStdDev => Some(mean()? - std()?),
        }
    }
    /// Binarizes the row according to the policy
    pub fn apply<'a>(&self, row: &'a [f64]) -> Cow<'a, [f64]> {
        match self.threshold(row) {
            Some(threshold) => Cow::Owned(binarize(row, threshold)),
            Option::None => Cow::Borrowed(row),
        }
    }
}
impl fmt::Display for ThresholdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ThresholdPolicy::*;
        match self {
            None => write!(f, "None"),
            Mean => write!(f, "Mean"),
            MeanPlusStdDev => write!(f, "Mean+StdDev"),
            MeanMinusStdDev => write!(f, "Mean-StdDev"),
        }
    }
}
impl FromStr for ThresholdPolicy {
    type Err = ThresholdPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ThresholdPolicy::*;
        match s.to_lowercase().as_str() {
            "none" => Ok(None),
            "mean" => Ok(Mean),
            "mean+stddev" => Ok(MeanPlusStdDev),
            "mean-stddev" => Ok(MeanMinusStdDev),
            _ => Err(ThresholdPolicyError(s.to_string())),
        }
    }
}

/// Two-level row: [`HIGH`] where `value >= threshold`, 0 elsewhere
pub fn binarize(row: &[f64], threshold: f64) -> Vec<f64> {
    row.iter()
        .map(|&value| if value >= threshold { HIGH } else { 0f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binarization() {
        assert_eq!(binarize(&[1f64, 5., 3., 2.], 3f64), vec![0f64, 255., 255., 0.]);
    }

    #[test]
    fn thresholds() {
        // mean 5, population std 2
        let row = [2f64, 4., 4., 4., 5., 5., 7., 9.];
        assert_eq!(ThresholdPolicy::None.threshold(&row), Option::None);
        assert_eq!(ThresholdPolicy::Mean.threshold(&row), Some(5f64));
        assert_eq!(ThresholdPolicy::MeanPlusStdDev.threshold(&row), Some(7f64));
        assert_eq!(ThresholdPolicy::MeanMinusStdDev.threshold(&row), Some(3f64));
        assert_eq!(
            &*ThresholdPolicy::MeanPlusStdDev.apply(&row),
            &[0f64, 0., 0., 0., 0., 0., 255., 255.]
        );
        assert!(matches!(ThresholdPolicy::None.apply(&row), Cow::Borrowed(_)));
    }

    #[test]
    fn names() {
        for policy in ThresholdPolicy::iter() {
            assert_eq!(policy.to_string().parse::<ThresholdPolicy>().unwrap(), policy);
            assert_eq!(
                serde_json::to_string(&policy).unwrap(),
                format!("\"{policy}\"")
            );
        }
        assert!("Median".parse::<ThresholdPolicy>().is_err());
        assert_eq!(
            ThresholdPolicy::candidates(),
            vec![
                ThresholdPolicy::Mean,
                ThresholdPolicy::MeanMinusStdDev,
                ThresholdPolicy::MeanPlusStdDev,
                ThresholdPolicy::None
            ]
        );
    }
}
