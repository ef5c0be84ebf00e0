//! Sample result artifacts
//!
//! A sample record merges the SEM parameters of the sample with the outcome
//! of the threshold optimization and is saved as `<sample>_Results.json`.

use crate::{
    aggregate::SampleAggregate,
    fill_factor::FillFactor,
    optimizer::{Candidate, PolicyEvaluation, SampleDecision},
    semlog::SemParameters,
    threshold::ThresholdPolicy,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    #[error("failed to create {1:?}")]
    Creating(#[source] std::io::Error, PathBuf),
    #[error("failed to open {1:?}")]
    Opening(#[source] std::io::Error, PathBuf),
    #[error("JSON error in {1:?}")]
    Json(#[source] serde_json::Error, PathBuf),
}
type Result<T> = std::result::Result<T, ResultsError>;

/// Writes `value` to the JSON file `path`
pub fn to_json_file<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ResultsError::Creating(e, path.to_path_buf()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| ResultsError::Json(e, path.to_path_buf()))
}

/// Reads a value from the JSON file `path`
pub fn from_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ResultsError::Opening(e, path.to_path_buf()))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| ResultsError::Json(e, path.to_path_buf()))
}

/// Grating period results of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(rename = "Sample")]
    pub sample: String,
    #[serde(flatten)]
    pub parameters: SemParameters,
    #[serde(rename = "Design Period")]
    pub design_period_nm: f64,
    #[serde(rename = "Threshold Method")]
    pub threshold: ThresholdPolicy,
    #[serde(flatten)]
    pub aggregate: SampleAggregate,
    #[serde(rename = "Grating Period")]
    pub grating_period_nm: f64,
    #[serde(rename = "Period Error")]
    pub period_error_nm: f64,
    #[serde(rename = "Threshold Candidates", default)]
    pub candidates: Vec<Candidate>,
    #[serde(flatten)]
    pub fill_factor: Option<FillFactor>,
}
impl SampleRecord {
    /// Record of the policy selected by the optimizer
    pub fn new(sample: &str, parameters: &SemParameters, decision: &SampleDecision) -> Self {
        Self {
            candidates: decision.candidates(),
            ..Self::from_evaluation(
                sample,
                parameters,
                decision.design_period_nm,
                decision.selected(),
            )
        }
    }
    /// Record of a single policy evaluation
    pub fn from_evaluation(
        sample: &str,
        parameters: &SemParameters,
        design_period_nm: f64,
        evaluation: &PolicyEvaluation,
    ) -> Self {
        Self {
            sample: sample.to_string(),
            parameters: parameters.clone(),
            design_period_nm,
            threshold: evaluation.policy,
            aggregate: evaluation.aggregate().clone(),
            grating_period_nm: evaluation.grating_period_nm,
            period_error_nm: evaluation.period_error_nm,
            candidates: vec![],
            fill_factor: None,
        }
    }
    pub fn fill_factor(self, fill_factor: Option<FillFactor>) -> Self {
        Self {
            fill_factor,
            ..self
        }
    }
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        log::info!("Saving {:?}", path.as_ref());
        to_json_file(self, path)
    }
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        from_json_file(path)
    }
}
