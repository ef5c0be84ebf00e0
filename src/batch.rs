//! Batch analysis of a directory of SEM samples
//!
//! A sample is a pair of files sharing the same stem: the SEM image `<stem>.bmp`
//! and the SEM log `<stem>.txt`. The stem follows the pattern
//! `<design key>_<grating>_<...>`, samples with the same design key and
//! grating belong to the same batch.

use crate::{
    config::{AnalysisConfig, DesignPeriods, DIAGNOSTIC_ROWS},
    error::error_chain,
    fill_factor::{FillFactor, LineWidths},
    optimizer::{OptimizerError, SampleDecision, ThresholdOptimizer},
    results::{self, ResultsError, SampleRecord},
    roi::{Roi, RoiError},
    semlog::{SemLogError, SemParameters},
    stats::{self, StatsError},
    threshold::ThresholdPolicy,
};
use glob::{glob, Pattern};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use serde::{ser::SerializeStruct, Serialize, Serializer};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};

/// Batch average placeholder for batches of a single sample
pub const NO_AVERAGE_VALUE: &str = "No Average Value";

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("invalid sample search pattern {1}")]
    Pattern(#[source] glob::PatternError, String),
    #[error("no SEM image and log pairs found in {0:?}")]
    NoSamples(PathBuf),
    #[error(r#"sample name "{0}" doesn't match "<design key>_<grating>_<...>""#)]
    SampleName(String),
    #[error("no design period for grating {0}")]
    DesignPeriod(String),
    #[error("failed to create {1:?}")]
    Creating(#[source] std::io::Error, PathBuf),
    #[error("failed to write {1:?}")]
    Csv(#[source] csv::Error, PathBuf),
    #[error("SEM log error")]
    SemLog(#[from] SemLogError),
    #[error("SEM image error")]
    Roi(#[from] RoiError),
    #[error("threshold optimization failed")]
    Optimizer(#[from] OptimizerError),
    #[error("failed to save results")]
    Results(#[from] ResultsError),
    #[error("batch statistics error")]
    Stats(#[from] StatsError),
}
type Result<T> = std::result::Result<T, BatchError>;

/// SEM log and image of a sample
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFiles {
    pub stem: String,
    pub log_path: PathBuf,
    pub image_path: PathBuf,
}

/// Pairs the SEM images `*.bmp` with the SEM logs `*.txt` of a directory
///
/// Images without a log are skipped with a warning.
pub fn discover<P: AsRef<Path>>(directory: P) -> Result<Vec<SampleFiles>> {
    let directory = directory.as_ref();
    let pattern = format!(
        "{}/*.bmp",
        Pattern::escape(&directory.to_string_lossy())
    );
    let paths = glob(&pattern).map_err(|e| BatchError::Pattern(e, pattern.clone()))?;
    let mut samples = vec![];
    for image_path in paths.filter_map(|p| p.ok()) {
        let Some(stem) = image_path.file_stem().and_then(|s| s.to_str()) else {
            log::warn!("{:?} is not a valid sample name, skipped", image_path);
            continue;
        };
        let log_path = image_path.with_extension("txt");
        if log_path.is_file() {
            samples.push(SampleFiles {
                stem: stem.to_string(),
                log_path,
                image_path: image_path.clone(),
            });
        } else {
            log::warn!("{:?} has no SEM log {:?}, skipped", image_path, log_path);
        }
    }
    Ok(samples)
}

/// Sample name: `<design key>_<grating>_<...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleName {
    pub design_key: String,
    pub grating: String,
    pub rest: Option<String>,
}
impl FromStr for SampleName {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(design_key), Some(grating), rest)
                if !design_key.is_empty() && !grating.is_empty() =>
            {
                Ok(Self {
                    design_key: design_key.to_string(),
                    grating: grating.to_string(),
                    rest: rest.map(|r| r.to_string()),
                })
            }
            _ => Err(BatchError::SampleName(s.to_string())),
        }
    }
}
impl SampleName {
    /// Batch key: `<design key>_<grating>`
    pub fn batch_key(&self) -> String {
        format!("{}_{}", self.design_key, self.grating)
    }
}

/// Analysis of a sample
#[derive(Debug, Clone)]
pub struct SampleAnalysis {
    pub files: SampleFiles,
    pub name: SampleName,
    pub parameters: SemParameters,
    pub decision: SampleDecision,
    pub line_widths: Option<LineWidths>,
}
impl SampleAnalysis {
    /// Fill factor for the grating period `grating_period_nm`
    pub fn fill_factor(&self, grating_period_nm: f64) -> Option<FillFactor> {
        self.line_widths
            .and_then(|widths| widths.fill_factor(grating_period_nm).ok())
    }
    /// Record of the selected threshold policy
    pub fn record(&self) -> SampleRecord {
        SampleRecord::new(&self.files.stem, &self.parameters, &self.decision)
            .fill_factor(self.fill_factor(self.decision.grating_period_nm()))
    }
    /// Records of every evaluated threshold policy
    pub fn policy_records(&self) -> Vec<(ThresholdPolicy, SampleRecord)> {
        self.decision
            .evaluations()
            .iter()
            .map(|evaluation| {
                (
                    evaluation.policy,
                    SampleRecord::from_evaluation(
                        &self.files.stem,
                        &self.parameters,
                        self.decision.design_period_nm,
                        evaluation,
                    )
                    .fill_factor(self.fill_factor(evaluation.grating_period_nm)),
                )
            })
            .collect()
    }
}

/// Runs the threshold optimization of a sample
pub fn analyse_sample(
    files: SampleFiles,
    design_periods: &DesignPeriods,
    config: &AnalysisConfig,
) -> Result<SampleAnalysis> {
    let name: SampleName = files.stem.parse()?;
    let design_period_nm = design_periods
        .get(&name.design_key)
        .ok_or_else(|| BatchError::DesignPeriod(name.design_key.clone()))?;
    let parameters = SemParameters::load(&files.log_path)?;
    let roi = Roi::load(
        &files.image_path,
        parameters.image_height,
        parameters.image_width,
    )?;
    let micrometers_per_pixel = parameters.calibration()?.micrometers_per_pixel();
    let decision = ThresholdOptimizer::new(&roi, micrometers_per_pixel)
        .config(config.clone())
        .optimize(design_period_nm as f64)?;
    log::info!(
        "{}: {:.3}+/-{:.3}nm ({} threshold)",
        files.stem,
        decision.grating_period_nm(),
        decision.period_error_nm(),
        decision.threshold()
    );
    let line_widths = match LineWidths::measure(&roi, micrometers_per_pixel) {
        Ok(widths) => Some(widths),
        Err(e) => {
            log::warn!("{}: no line widths: {}", files.stem, error_chain(&e));
            None
        }
    };
    Ok(SampleAnalysis {
        files,
        name,
        parameters,
        decision,
        line_widths,
    })
}

/// Grating period average of a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchAverage {
    Computed {
        average_period_nm: f64,
        period_error_nm: f64,
    },
    /// the batch has a single sample
    NoAverageValue,
}
impl Serialize for BatchAverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            BatchAverage::Computed {
                average_period_nm,
                period_error_nm,
            } => {
                let mut state = serializer.serialize_struct("BatchAverage", 2)?;
                state.serialize_field("Average Period", average_period_nm)?;
                state.serialize_field("Period Error", period_error_nm)?;
                state.end()
            }
            BatchAverage::NoAverageValue => serializer.serialize_str(NO_AVERAGE_VALUE),
        }
    }
}

/// Mean and standard error of the grating periods of a batch
pub fn average_grating_period(periods: &[f64]) -> Result<BatchAverage> {
    if periods.len() == 1 {
        return Ok(BatchAverage::NoAverageValue);
    }
    let (average_period_nm, period_error_nm) = stats::mean_and_error(periods)?;
    Ok(BatchAverage::Computed {
        average_period_nm,
        period_error_nm,
    })
}

/// Grating periods of the samples of a batch, saved as `<batch>_Period.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    #[serde(rename = "Batch")]
    pub batch: String,
    #[serde(rename = "Design Period")]
    pub design_period_nm: f64,
    #[serde(rename = "Grating Periods")]
    pub periods_nm: BTreeMap<String, f64>,
    #[serde(rename = "Period Errors")]
    pub period_errors_nm: BTreeMap<String, f64>,
    #[serde(rename = "Average Grating Period")]
    pub average: BatchAverage,
}
impl BatchSummary {
    pub fn new(batch: &str, samples: &[&SampleAnalysis]) -> Result<Self> {
        let periods: Vec<f64> = samples
            .iter()
            .map(|s| s.decision.grating_period_nm())
            .collect();
        Ok(Self {
            batch: batch.to_string(),
            design_period_nm: samples
                .first()
                .map_or(f64::NAN, |s| s.decision.design_period_nm),
            periods_nm: samples
                .iter()
                .map(|s| (s.files.stem.clone(), s.decision.grating_period_nm()))
                .collect(),
            period_errors_nm: samples
                .iter()
                .map(|s| (s.files.stem.clone(), s.decision.period_error_nm()))
                .collect(),
            average: average_grating_period(&periods)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct TableRow<'a> {
    #[serde(rename = "Sample")]
    sample: &'a str,
    #[serde(rename = "Batch")]
    batch: String,
    #[serde(rename = "Design Period [nm]")]
    design_period_nm: f64,
    #[serde(rename = "Threshold Method")]
    threshold: ThresholdPolicy,
    #[serde(rename = "Grating Period [nm]")]
    grating_period_nm: f64,
    #[serde(rename = "Period Error [nm]")]
    period_error_nm: f64,
    #[serde(rename = "Fill Factor")]
    fill_factor: Option<f64>,
}

/// Writes the table of the sample grating periods
pub fn to_csv<P: AsRef<Path>>(samples: &[SampleAnalysis], path: P) -> Result<()> {
    let path = path.as_ref();
    let csv_err = |e| BatchError::Csv(e, path.to_path_buf());
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for sample in samples {
        wtr.serialize(TableRow {
            sample: &sample.files.stem,
            batch: sample.name.batch_key(),
            design_period_nm: sample.decision.design_period_nm,
            threshold: sample.decision.threshold(),
            grating_period_nm: sample.decision.grating_period_nm(),
            period_error_nm: sample.decision.period_error_nm(),
            fill_factor: sample
                .fill_factor(sample.decision.grating_period_nm())
                .map(|f| f.fill_factor),
        })
        .map_err(csv_err)?;
    }
    wtr.flush()
        .map_err(|e| BatchError::Csv(e.into(), path.to_path_buf()))
}

/// Batch analysis outcome
#[derive(Debug, Default)]
pub struct BatchReport {
    pub samples: Vec<SampleAnalysis>,
    pub summaries: Vec<BatchSummary>,
    /// stems of the samples that failed
    pub failures: Vec<String>,
}

/// Batch analysis of a directory
#[derive(Debug, Clone)]
pub struct BatchAnalysis {
    directory: PathBuf,
    output: Option<PathBuf>,
    design_periods: DesignPeriods,
    config: AnalysisConfig,
    all_policies: bool,
    plot: bool,
}
impl BatchAnalysis {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            output: None,
            design_periods: Default::default(),
            config: Default::default(),
            all_policies: false,
            plot: false,
        }
    }
    /// Results directory, default to the samples directory
    pub fn output<P: AsRef<Path>>(self, output: P) -> Self {
        Self {
            output: Some(output.as_ref().to_path_buf()),
            ..self
        }
    }
    pub fn design_periods(self, design_periods: DesignPeriods) -> Self {
        Self {
            design_periods,
            ..self
        }
    }
    pub fn config(self, config: AnalysisConfig) -> Self {
        Self { config, ..self }
    }
    /// Saves the results of every threshold policy
    pub fn all_policies(self, all_policies: bool) -> Self {
        Self {
            all_policies,
            ..self
        }
    }
    /// Saves the diagnostic figures of each sample
    ///
    /// [`DIAGNOSTIC_ROWS`] rows are plotted unless the analysis configuration
    /// sets the number of diagnostic rows.
    pub fn plot(self, plot: bool) -> Self {
        Self { plot, ..self }
    }
    /// Analysis configuration of the samples
    fn analysis_config(&self) -> AnalysisConfig {
        if self.plot && self.config.diagnostic_rows == 0 {
            self.config.clone().diagnostic_rows(DIAGNOSTIC_ROWS)
        } else {
            self.config.clone()
        }
    }
    fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.directory.clone())
    }
    fn process(
        &self,
        files: SampleFiles,
        config: &AnalysisConfig,
        output: &Path,
    ) -> Result<SampleAnalysis> {
        let analysis = analyse_sample(files, &self.design_periods, config)?;
        let stem = &analysis.files.stem;
        analysis
            .record()
            .save(output.join(format!("{stem}_Results.json")))?;
        if self.all_policies {
            for (policy, record) in analysis.policy_records() {
                record.save(output.join(format!("{stem}_{policy}_Results.json")))?;
            }
        }
        if self.plot {
            self.plot_diagnostics(&analysis, output);
        }
        Ok(analysis)
    }
    #[cfg(feature = "plot")]
    fn plot_diagnostics(&self, analysis: &SampleAnalysis, output: &Path) {
        let stem = &analysis.files.stem;
        let diagnostics = &analysis.decision.selected().analysis.diagnostics;
        if let Err(e) = crate::plot::spectra(diagnostics, output.join(format!("{stem}_spectra.png")))
        {
            log::warn!("{stem}: failed to plot the spectra: {e}");
        }
        if let Err(e) = crate::plot::rows(diagnostics, output.join(format!("{stem}_rows.png"))) {
            log::warn!("{stem}: failed to plot the rows: {e}");
        }
    }
    #[cfg(not(feature = "plot"))]
    fn plot_diagnostics(&self, analysis: &SampleAnalysis, _output: &Path) {
        log::warn!(
            "{}: plotting requires the \"plot\" feature",
            analysis.files.stem
        );
    }
    /// Analyses all the samples and saves the batch summaries
    pub fn run(&self) -> Result<BatchReport> {
        let files = discover(&self.directory)?;
        if files.is_empty() {
            return Err(BatchError::NoSamples(self.directory.clone()));
        }
        let output = self.output_path();
        fs::create_dir_all(&output).map_err(|e| BatchError::Creating(e, output.clone()))?;

        let config = self.analysis_config();
        log::info!("Analysing {} samples...", files.len());
        let now = Instant::now();
        let pb = ProgressBar::new(files.len() as u64);
        let outcomes: Vec<_> = files
            .into_par_iter()
            .progress_with(pb)
            .map(|files| {
                let stem = files.stem.clone();
                (stem, self.process(files, &config, &output))
            })
            .collect();
        log::info!("... analysed in {:}s", now.elapsed().as_secs());

        let mut report = BatchReport::default();
        for (stem, outcome) in outcomes {
            match outcome {
                Ok(analysis) => report.samples.push(analysis),
                Err(e) => {
                    log::error!("{stem}: {}", error_chain(&e));
                    report.failures.push(stem);
                }
            }
        }
        if !report.failures.is_empty() {
            log::warn!(
                "{} out of {} samples failed",
                report.failures.len(),
                report.failures.len() + report.samples.len()
            );
        }

        let mut batches: BTreeMap<String, Vec<&SampleAnalysis>> = BTreeMap::new();
        for sample in &report.samples {
            batches
                .entry(sample.name.batch_key())
                .or_default()
                .push(sample);
        }
        let summaries = batches
            .into_iter()
            .map(|(batch, samples)| -> Result<BatchSummary> {
                let summary = BatchSummary::new(&batch, &samples)?;
                results::to_json_file(&summary, output.join(format!("{batch}_Period.json")))?;
                Ok(summary)
            })
            .collect::<Result<Vec<_>>>()?;
        report.summaries = summaries;
        to_csv(&report.samples, output.join("Grating_Periods.csv"))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semlog::tests::LOG;
    use approx::assert_relative_eq;
    use image::{GrayImage, Luma};

    fn write_sample(dir: &Path, stem: &str) {
        fs::write(dir.join(format!("{stem}.txt")), LOG).unwrap();
        // 16px period grating
        GrayImage::from_fn(128, 20, |x, _| Luma([if x % 16 < 8 { 200 } else { 40 }]))
            .save(dir.join(format!("{stem}.bmp")))
            .unwrap();
    }

    #[test]
    fn sample_name() {
        let name: SampleName = "A1_G2_01_x".parse().unwrap();
        assert_eq!(name.design_key, "A1");
        assert_eq!(name.rest.as_deref(), Some("01_x"));
        assert_eq!(name.batch_key(), "A1_G2");
        assert_eq!("A3_G1".parse::<SampleName>().unwrap().rest, None);
        assert!("A1".parse::<SampleName>().is_err());
        assert!("_G1_01".parse::<SampleName>().is_err());
    }

    #[test]
    fn pairing() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path(), "A1_G1_02");
        write_sample(dir.path(), "A1_G1_01");
        fs::remove_file(dir.path().join("A1_G1_02.txt")).unwrap();
        fs::write(dir.path().join("A2_G1_01.txt"), LOG).unwrap();
        let samples = discover(dir.path()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].stem, "A1_G1_01");
        assert_eq!(samples[0].log_path, dir.path().join("A1_G1_01.txt"));
    }

    #[test]
    fn batch_of_one() {
        let average = average_grating_period(&[341f64]).unwrap();
        assert_eq!(average, BatchAverage::NoAverageValue);
        assert_eq!(
            serde_json::to_value(average).unwrap(),
            serde_json::json!("No Average Value")
        );
        let average = average_grating_period(&[340f64, 342.]).unwrap();
        assert_eq!(
            average,
            BatchAverage::Computed {
                average_period_nm: 341f64,
                period_error_nm: 1f64
            }
        );
        assert_eq!(serde_json::to_value(average).unwrap()["Average Period"], 341f64);
        assert!(average_grating_period(&[]).is_err());
    }

    #[test]
    fn unknown_design() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path(), "Z9_G1_01");
        let files = discover(dir.path()).unwrap().remove(0);
        assert!(matches!(
            analyse_sample(files, &DesignPeriods::default(), &AnalysisConfig::default()),
            Err(BatchError::DesignPeriod(key)) if key == "Z9"
        ));
    }

    #[test]
    fn run_batch() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results");
        for stem in ["A1_G1_01", "A1_G1_02", "A2_G1_01"] {
            write_sample(dir.path(), stem);
        }
        fs::write(dir.path().join("A1_G1_03.txt"), "$CM_MAG 1000\n").unwrap();
        GrayImage::new(8, 8)
            .save(dir.path().join("A1_G1_03.bmp"))
            .unwrap();
        let report = BatchAnalysis::new(dir.path())
            .output(&output)
            .config(
                AnalysisConfig::default()
                    .num_peaks(3)
                    .policies(vec![ThresholdPolicy::Mean, ThresholdPolicy::None]),
            )
            .all_policies(true)
            .run()
            .unwrap();
        assert_eq!(report.failures, vec!["A1_G1_03".to_string()]);
        assert_eq!(report.samples.len(), 3);
        // 1um over 160px: 6.25nm per pixel
        for sample in &report.samples {
            assert_relative_eq!(sample.decision.grating_period_nm(), 100f64, max_relative = 1e-9);
        }
        assert_eq!(report.summaries.len(), 2);
        assert!(matches!(
            report.summaries[0].average,
            BatchAverage::Computed { average_period_nm, .. } if (average_period_nm - 100f64).abs() < 1e-6
        ));
        assert_eq!(report.summaries[1].average, BatchAverage::NoAverageValue);
        for file in [
            "A1_G1_01_Results.json",
            "A1_G1_01_Mean_Results.json",
            "A1_G1_Period.json",
            "A2_G1_Period.json",
            "Grating_Periods.csv",
        ] {
            assert!(output.join(file).is_file(), "{file}");
        }
        let record = SampleRecord::load(output.join("A2_G1_01_Results.json")).unwrap();
        assert_eq!(record.design_period_nm, 405f64);
        assert!(!record.candidates.is_empty());
        // 8px lines over a 16px period
        let fill_factor = record.fill_factor.unwrap();
        assert_relative_eq!(fill_factor.fill_factor, 0.5, max_relative = 1e-9);
        assert_relative_eq!(fill_factor.widths.line_width_nm, 50f64, max_relative = 1e-9);
    }

    #[test]
    fn plot_after_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("results");
        write_sample(dir.path(), "A1_G1_01");
        let report = BatchAnalysis::new(dir.path())
            .output(&output)
            .plot(true)
            .config(
                AnalysisConfig::default()
                    .num_peaks(3)
                    .policies(vec![ThresholdPolicy::Mean]),
            )
            .run()
            .unwrap();
        let diagnostics = &report.samples[0].decision.selected().analysis.diagnostics;
        assert_eq!(diagnostics.len(), DIAGNOSTIC_ROWS);
        #[cfg(feature = "plot")]
        for file in ["A1_G1_01_spectra.png", "A1_G1_01_rows.png"] {
            assert!(output.join(file).is_file(), "{file}");
        }
    }
}
