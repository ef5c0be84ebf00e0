//! Threshold policy selection
//!
//! The grating analysis is repeated for each threshold policy and the policy
//! whose largest average period is the closest to the design period wins.

use crate::{
    aggregate::{AggregateError, Analysis, GratingAnalysis, SampleAggregate},
    config::AnalysisConfig,
    roi::Roi,
    threshold::ThresholdPolicy,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("no threshold policy to evaluate")]
    NoPolicy,
    #[error("at least one spectrum peak per row is required")]
    ZeroPeaks,
    #[error("none of the threshold policies yields spectrum peaks")]
    NoPeaks,
    #[error("{0} threshold analysis failed")]
    Aggregate(ThresholdPolicy, #[source] AggregateError),
}
type Result<T> = std::result::Result<T, OptimizerError>;

/// Grating analysis for one threshold policy
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyEvaluation {
    pub policy: ThresholdPolicy,
    pub analysis: Analysis,
    /// largest average period
    pub grating_period_nm: f64,
    /// standard error of the largest average period
    pub period_error_nm: f64,
}
impl PolicyEvaluation {
    pub fn aggregate(&self) -> &SampleAggregate {
        &self.analysis.aggregate
    }
    /// Absolute difference between the grating period and `design_period_nm`
    pub fn difference(&self, design_period_nm: f64) -> f64 {
        (design_period_nm - self.grating_period_nm).abs()
    }
}

/// Summary of a policy evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "Threshold Method")]
    pub policy: ThresholdPolicy,
    #[serde(rename = "Grating Period")]
    pub grating_period_nm: f64,
    #[serde(rename = "Difference")]
    pub difference_nm: f64,
}

/// Threshold policy selected for a sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDecision {
    pub design_period_nm: f64,
    selected: usize,
    evaluations: Vec<PolicyEvaluation>,
}
impl SampleDecision {
    /// Evaluation of the winning policy
    pub fn selected(&self) -> &PolicyEvaluation {
        &self.evaluations[self.selected]
    }
    pub fn threshold(&self) -> ThresholdPolicy {
        self.selected().policy
    }
    pub fn grating_period_nm(&self) -> f64 {
        self.selected().grating_period_nm
    }
    pub fn period_error_nm(&self) -> f64 {
        self.selected().period_error_nm
    }
    /// Evaluations of all the policies with spectrum peaks, in evaluation order
    pub fn evaluations(&self) -> &[PolicyEvaluation] {
        &self.evaluations
    }
    pub fn candidates(&self) -> Vec<Candidate> {
        self.evaluations
            .iter()
            .map(|e| Candidate {
                policy: e.policy,
                grating_period_nm: e.grating_period_nm,
                difference_nm: e.difference(self.design_period_nm),
            })
            .collect()
    }
}

/// Index of the representative period closest to the design period
///
/// Ties are resolved in favor of the first entry.
pub fn select_policy(representatives: &[(ThresholdPolicy, f64)], design_period_nm: f64) -> Option<usize> {
    representatives
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, (_, period))| {
            let difference = (design_period_nm - period).abs();
            match best {
                Some((_, min)) if min <= difference => best,
                _ => Some((i, difference)),
            }
        })
        .map(|(i, _)| i)
}

/// Threshold policy optimizer of a region of interest
pub struct ThresholdOptimizer<'a> {
    roi: &'a Roi,
    micrometers_per_pixel: f64,
    config: AnalysisConfig,
}
impl<'a> ThresholdOptimizer<'a> {
    pub fn new(roi: &'a Roi, micrometers_per_pixel: f64) -> Self {
        Self {
            roi,
            micrometers_per_pixel,
            config: Default::default(),
        }
    }
    pub fn config(self, config: AnalysisConfig) -> Self {
        Self { config, ..self }
    }
    /// Runs the grating analysis for every policy
    ///
    /// Policies without any spectrum peak are skipped.
    pub fn evaluate(&self) -> Result<Vec<PolicyEvaluation>> {
        if self.config.policies.is_empty() {
            return Err(OptimizerError::NoPolicy);
        }
        if self.config.num_peaks == 0 {
            return Err(OptimizerError::ZeroPeaks);
        }
        let mut evaluations = vec![];
        for &policy in &self.config.policies {
            let analysis = GratingAnalysis::new(self.roi, self.micrometers_per_pixel)
                .num_peaks(self.config.num_peaks)
                .threshold(policy)
                .diagnostic_rows(self.config.diagnostic_rows)
                .analyse()
                .map_err(|e| OptimizerError::Aggregate(policy, e))?;
            match analysis.aggregate.max_period() {
                Some((grating_period_nm, period_error_nm)) => {
                    log::debug!("{policy} threshold: {grating_period_nm:.3}nm");
                    evaluations.push(PolicyEvaluation {
                        policy,
                        analysis,
                        grating_period_nm,
                        period_error_nm,
                    })
                }
                None => log::warn!("{policy} threshold: no spectrum peaks, skipped"),
            }
        }
        Ok(evaluations)
    }
    /// Selects the policy with the grating period closest to `design_period_nm`
    pub fn optimize(&self, design_period_nm: f64) -> Result<SampleDecision> {
        let evaluations = self.evaluate()?;
        let representatives: Vec<_> = evaluations
            .iter()
            .map(|e| (e.policy, e.grating_period_nm))
            .collect();
        let selected =
            select_policy(&representatives, design_period_nm).ok_or(OptimizerError::NoPeaks)?;
        Ok(SampleDecision {
            design_period_nm,
            selected,
            evaluations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::square_grating;
    use approx::assert_relative_eq;
    use ThresholdPolicy::*;

    #[test]
    fn closest_to_design() {
        let representatives = [(None, 310f64), (Mean, 340.), (MeanPlusStdDev, 600.)];
        assert_eq!(select_policy(&representatives, 330f64), Some(1));
    }

    #[test]
    fn ties_keep_first() {
        let representatives = [(Mean, 320f64), (None, 340.), (MeanMinusStdDev, 320.)];
        assert_eq!(select_policy(&representatives, 330f64), Some(0));
        assert_eq!(select_policy(&[], 330f64), Option::None);
    }

    #[test]
    fn square_grating_decision() {
        // 8 periods of 16px over 128px at 20nm per pixel
        let roi = square_grating(20, 128, 16);
        let decision = ThresholdOptimizer::new(&roi, 0.02)
            .config(AnalysisConfig::default().num_peaks(3))
            .optimize(320f64)
            .unwrap();
        assert_eq!(decision.threshold(), Mean);
        assert_relative_eq!(decision.grating_period_nm(), 320f64, max_relative = 1e-9);
        assert_relative_eq!(decision.period_error_nm(), 0f64, epsilon = 1e-9);
        let candidates = decision.candidates();
        assert_eq!(candidates[0].policy, Mean);
        assert!(candidates.iter().any(|c| c.policy == None));
        assert_eq!(
            decision.selected().aggregate().average_periods_nm.len(),
            3
        );
    }

    #[test]
    fn later_policy_wins() {
        // 8px grating with a 4px wide bump every 32px
        let row: Vec<f64> = (0..128)
            .map(|t| match (t % 32 < 4, t % 8 < 4) {
                (true, _) => 250f64,
                (false, true) => 100f64,
                _ => 0f64,
            })
            .collect();
        let roi = Roi::try_from(vec![row; 4]).unwrap();
        // 10nm per pixel: bin 16 is 80nm, bin 4 is 320nm
        let decision = ThresholdOptimizer::new(&roi, 0.01)
            .config(
                AnalysisConfig::default()
                    .num_peaks(1)
                    .policies(vec![Mean, None, MeanPlusStdDev]),
            )
            .optimize(300f64)
            .unwrap();
        assert_eq!(decision.threshold(), MeanPlusStdDev);
        assert_relative_eq!(decision.grating_period_nm(), 320f64, max_relative = 1e-9);
        assert_relative_eq!(decision.period_error_nm(), 0f64, epsilon = 1e-9);
        let candidates = decision.candidates();
        assert_eq!(
            candidates.iter().map(|c| c.policy).collect::<Vec<_>>(),
            vec![Mean, None, MeanPlusStdDev]
        );
        assert_relative_eq!(candidates[0].grating_period_nm, 80f64, max_relative = 1e-9);
        assert_relative_eq!(candidates[1].grating_period_nm, 80f64, max_relative = 1e-9);
        assert_relative_eq!(candidates[2].difference_nm, 20f64, max_relative = 1e-9);
    }

    #[test]
    fn skipped_policies() {
        // only the raw rows have a peak off the zero frequency bin
        let roi = Roi::try_from(vec![vec![-10f64, -10., 10., 10.]; 3]).unwrap();
        let decision = ThresholdOptimizer::new(&roi, 1f64).optimize(1000f64).unwrap();
        assert_eq!(decision.evaluations().len(), 1);
        assert_eq!(decision.threshold(), None);
        assert_relative_eq!(decision.grating_period_nm(), 4000f64, max_relative = 1e-9);
        assert_relative_eq!(decision.period_error_nm(), 0f64, epsilon = 1e-9);
    }

    #[test]
    fn zero_peaks() {
        let roi = square_grating(4, 64, 8);
        assert!(matches!(
            ThresholdOptimizer::new(&roi, 1f64)
                .config(AnalysisConfig::default().num_peaks(0))
                .optimize(100f64),
            Err(OptimizerError::ZeroPeaks)
        ));
    }

    #[test]
    fn no_peaks() {
        let roi = Roi::try_from(vec![vec![9f64; 2]; 3]).unwrap();
        assert!(matches!(
            ThresholdOptimizer::new(&roi, 1f64).optimize(100f64),
            Err(OptimizerError::NoPeaks)
        ));
        assert!(matches!(
            ThresholdOptimizer::new(&roi, 1f64)
                .config(AnalysisConfig::default().policies(vec![]))
                .optimize(100f64),
            Err(OptimizerError::NoPolicy)
        ));
    }

    #[test]
    fn too_few_rows() {
        let roi = square_grating(1, 64, 8);
        assert!(matches!(
            ThresholdOptimizer::new(&roi, 1f64).optimize(100f64),
            Err(OptimizerError::Aggregate(Mean, AggregateError::TooFewRows(1)))
        ));
    }
}
