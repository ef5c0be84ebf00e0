//! Threshold policy benchmark against the design periods
//!
//! For each sample record, the benchmark is the smallest absolute difference
//! between the design period and the average periods of the record.
//! The best threshold policy of each batch is the one with the smallest
//! benchmark.

use crate::{
    batch::{BatchError, SampleName},
    results::{self, ResultsError, SampleRecord},
    threshold::ThresholdPolicy,
};
use glob::{glob, Pattern};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

pub const BEST_BENCHMARKS: &str = "Best_design_Benchmarks.json";
pub const ALL_BENCHMARKS: &str = "All_design_Benchmark_Data.json";

#[derive(Debug, thiserror::Error)]
pub enum BenchmarkError {
    #[error("invalid results search pattern {1}")]
    Pattern(#[source] glob::PatternError, String),
    #[error("no results found in {0:?}")]
    NoResults(PathBuf),
    #[error("failed to load or save benchmarks")]
    Results(#[from] ResultsError),
    #[error("invalid sample")]
    Sample(#[from] BatchError),
}
type Result<T> = std::result::Result<T, BenchmarkError>;

/// Benchmark of a sample record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    #[serde(rename = "Sample")]
    pub sample: String,
    #[serde(rename = "Threshold Method")]
    pub method: ThresholdPolicy,
    #[serde(rename = "Difference")]
    pub difference_nm: f64,
}
impl Benchmark {
    /// Benchmark of a record, `None` if the record has no average period
    pub fn new(record: &SampleRecord) -> Option<Self> {
        record
            .aggregate
            .average_periods_nm
            .iter()
            .map(|period| (record.design_period_nm - period).abs())
            .min_by(|a, b| a.total_cmp(b))
            .map(|difference_nm| Self {
                sample: record.sample.clone(),
                method: record.threshold,
                difference_nm,
            })
    }
}

/// Best benchmark per batch and every other benchmark
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignBenchmark {
    /// best benchmark by batch key
    pub best: BTreeMap<String, Benchmark>,
    /// benchmark differences by `<sample>_<method>`
    pub others: BTreeMap<String, f64>,
}
impl DesignBenchmark {
    /// Benchmarks the records, ties keep the first record
    pub fn from_records(records: &[SampleRecord]) -> Result<Self> {
        let mut benchmarks = Self::default();
        for record in records {
            let Some(benchmark) = Benchmark::new(record) else {
                log::warn!("{} ({}): no average period", record.sample, record.threshold);
                continue;
            };
            let batch = record.sample.parse::<SampleName>()?.batch_key();
            match benchmarks.best.get(&batch) {
                Some(best) if best.difference_nm <= benchmark.difference_nm => {
                    benchmarks.others.insert(
                        format!("{}_{}", benchmark.sample, benchmark.method),
                        benchmark.difference_nm,
                    );
                }
                _ => {
                    if let Some(previous) = benchmarks.best.insert(batch, benchmark) {
                        benchmarks.others.insert(
                            format!("{}_{}", previous.sample, previous.method),
                            previous.difference_nm,
                        );
                    }
                }
            }
        }
        Ok(benchmarks)
    }
    /// Benchmarks the `*_Results.json` records of a directory
    pub fn load<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref();
        let pattern = format!(
            "{}/*_Results.json",
            Pattern::escape(&directory.to_string_lossy())
        );
        log::info!("Loading {}...", pattern);
        let records = glob(&pattern)
            .map_err(|e| BenchmarkError::Pattern(e, pattern.clone()))?
            .filter_map(|p| p.ok())
            .map(SampleRecord::load)
            .collect::<std::result::Result<Vec<_>, ResultsError>>()?;
        if records.is_empty() {
            return Err(BenchmarkError::NoResults(directory.to_path_buf()));
        }
        log::info!("... {} records loaded", records.len());
        Self::from_records(&records)
    }
    /// Number of batches won by each threshold policy
    pub fn tally(&self) -> Vec<(ThresholdPolicy, usize)> {
        let counts = self.best.values().map(|b| b.method).counts();
        ThresholdPolicy::candidates()
            .into_iter()
            .map(|policy| (policy, counts.get(&policy).copied().unwrap_or_default()))
            .collect()
    }
    /// Writes the best and other benchmarks into `directory`
    pub fn save<P: AsRef<Path>>(&self, directory: P) -> Result<()> {
        let directory = directory.as_ref();
        results::to_json_file(&self.best, directory.join(BEST_BENCHMARKS))?;
        results::to_json_file(&self.others, directory.join(ALL_BENCHMARKS))?;
        Ok(())
    }
}
