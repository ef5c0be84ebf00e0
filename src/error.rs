use crate::{
    aggregate::AggregateError, batch::BatchError, benchmark::BenchmarkError,
    calibration::CalibrationError, config::ConfigError, fill_factor::FillFactorError,
    optimizer::OptimizerError, results::ResultsError, roi::RoiError, semlog::SemLogError,
    stats::StatsError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `calibration` module")]
    Calibration(#[from] CalibrationError),
    #[error("Error in the `semlog` module")]
    SemLog(#[from] SemLogError),
    #[error("Error in the `roi` module")]
    Roi(#[from] RoiError),
    #[error("Error in the `stats` module")]
    Stats(#[from] StatsError),
    #[error("Error in the `aggregate` module")]
    Aggregate(#[from] AggregateError),
    #[error("Error in the `optimizer` module")]
    Optimizer(#[from] OptimizerError),
    #[error("Error in the `results` module")]
    Results(#[from] ResultsError),
    #[error("Error in the `batch` module")]
    Batch(#[from] BatchError),
    #[error("Error in the `benchmark` module")]
    Benchmark(#[from] BenchmarkError),
    #[error("Error in the `config` module")]
    Config(#[from] ConfigError),
    #[error("Error in the `fill_factor` module")]
    FillFactor(#[from] FillFactorError),
}

/// Error message followed by its causes
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut current = e.source();
    while let Some(cause) = current {
        message.push_str(&format!(": {}", cause));
        current = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain() {
        let e: Error = SemLogError::MissingKey("CM_MAG".into()).into();
        assert_eq!(
            error_chain(&e),
            r#"Error in the `semlog` module: SEM log entry "CM_MAG" is missing"#
        );
    }
}
