use grating_period::{
    config::{parse_num_peaks, NUM_PEAKS},
    AnalysisConfig, BatchAnalysis, BatchAverage, DesignPeriods,
    ThresholdPolicy,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "grating-period",
    about = "Diffraction grating period of a directory of SEM images"
)]
struct Opt {
    /// Directory with the SEM images (*.bmp) and logs (*.txt)
    #[structopt(parse(from_os_str))]
    directory: PathBuf,
    /// Results directory [default: the SEM directory]
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// Number of spectrum peaks per row
    #[structopt(short = "k", long, default_value = "5", parse(try_from_str = parse_num_peaks))]
    num_peaks: usize,
    /// Threshold policy: None, Mean, Mean+StdDev or Mean-StdDev (repeatable) [default: all]
    #[structopt(short, long)]
    policy: Vec<ThresholdPolicy>,
    /// Saves the results of every threshold policy
    #[structopt(short, long)]
    all_policies: bool,
    /// Plots the spectra and the binarized rows of each sample
    #[structopt(long)]
    plot: bool,
    /// Design periods table file [default: $DESIGN_PERIODS or the built-in table]
    #[structopt(short, long, parse(from_os_str))]
    design_periods: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let design_periods = match &opt.design_periods {
        Some(path) => DesignPeriods::from_file(path)?,
        None => DesignPeriods::from_env_or_default()?,
    };
    let mut config = AnalysisConfig::default().num_peaks(opt.num_peaks);
    if !opt.policy.is_empty() {
        config = config.policies(opt.policy.clone());
    }
    if opt.num_peaks != NUM_PEAKS {
        log::info!("{} spectrum peaks per row", opt.num_peaks);
    }

    let mut batch = BatchAnalysis::new(&opt.directory)
        .design_periods(design_periods)
        .config(config)
        .all_policies(opt.all_policies)
        .plot(opt.plot);
    if let Some(output) = &opt.output {
        batch = batch.output(output);
    }
    let report = batch.run()?;

    println!(
        "{} samples analysed, {} failed",
        report.samples.len(),
        report.failures.len()
    );
    for summary in &report.summaries {
        match summary.average {
            BatchAverage::Computed {
                average_period_nm,
                period_error_nm,
            } => println!(
                " - {:8}: {:8.3}+/-{:.3}nm (design: {}nm, {} samples)",
                summary.batch,
                average_period_nm,
                period_error_nm,
                summary.design_period_nm,
                summary.periods_nm.len()
            ),
            BatchAverage::NoAverageValue => println!(
                " - {:8}: {:8.3}nm (design: {}nm, 1 sample)",
                summary.batch,
                summary.periods_nm.values().next().copied().unwrap_or(f64::NAN),
                summary.design_period_nm,
            ),
        }
    }

    Ok(())
}
