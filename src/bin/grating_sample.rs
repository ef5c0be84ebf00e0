use anyhow::Context;
use grating_period::{
    batch::SampleName, config::parse_num_peaks, AnalysisConfig, DesignPeriods, LineWidths, Roi,
    SampleRecord, SemParameters, ThresholdOptimizer, ThresholdPolicy,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "grating-sample",
    about = "Diffraction grating period of a single SEM image"
)]
struct Opt {
    /// SEM log file
    #[structopt(parse(from_os_str))]
    log: PathBuf,
    /// SEM image file
    #[structopt(parse(from_os_str))]
    image: PathBuf,
    /// Grating design period in nm [default: from the sample name design key]
    #[structopt(short, long)]
    design_period: Option<u32>,
    /// Number of spectrum peaks per row
    #[structopt(short = "k", long, default_value = "5", parse(try_from_str = parse_num_peaks))]
    num_peaks: usize,
    /// Threshold policy (repeatable) [default: all]
    #[structopt(short, long)]
    policy: Vec<ThresholdPolicy>,
    /// Saves the sample record to this JSON file
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// Plots the spectra and the binarized rows of the selected threshold policy
    #[cfg(feature = "plot")]
    #[structopt(long)]
    plot: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let stem = opt
        .image
        .file_stem()
        .and_then(|s| s.to_str())
        .context("invalid SEM image file name")?
        .to_string();
    let design_period = match opt.design_period {
        Some(period) => period,
        None => {
            let name: SampleName = stem.parse()?;
            DesignPeriods::from_env_or_default()?
                .get(&name.design_key)
                .with_context(|| format!("no design period for {}", name.design_key))?
        }
    };

    let parameters = SemParameters::load(&opt.log)?;
    let roi = Roi::load(&opt.image, parameters.image_height, parameters.image_width)?;
    let calibration = parameters.calibration()?;
    println!(
        "{}: {}x{} pixels @ {:.3}nm/pixel",
        stem,
        roi.height(),
        roi.width(),
        calibration.micrometers_per_pixel() * 1e3
    );

    let mut config = AnalysisConfig::default().num_peaks(opt.num_peaks);
    if !opt.policy.is_empty() {
        config = config.policies(opt.policy.clone());
    }
    #[cfg(feature = "plot")]
    if opt.plot {
        config = config.diagnostic_rows(grating_period::config::DIAGNOSTIC_ROWS);
    }
    let decision = ThresholdOptimizer::new(&roi, calibration.micrometers_per_pixel())
        .config(config)
        .optimize(design_period as f64)?;

    for candidate in decision.candidates() {
        println!(
            " - {:12}: {:9.3}nm (|design - period|: {:.3}nm)",
            candidate.policy.to_string(),
            candidate.grating_period_nm,
            candidate.difference_nm
        );
    }
    println!(
        "Grating period: {:.3}+/-{:.3}nm ({} threshold, design: {}nm)",
        decision.grating_period_nm(),
        decision.period_error_nm(),
        decision.threshold(),
        design_period
    );

    let fill_factor = LineWidths::measure(&roi, calibration.micrometers_per_pixel())?
        .fill_factor(decision.grating_period_nm())?;
    println!(
        "Fill factor: {:.3}+/-{:.3} (line width: {:.3}+/-{:.3}nm)",
        fill_factor.fill_factor,
        fill_factor.fill_factor_error,
        fill_factor.widths.line_width_nm,
        fill_factor.widths.line_width_error_nm
    );

    if let Some(path) = &opt.output {
        SampleRecord::new(&stem, &parameters, &decision)
            .fill_factor(Some(fill_factor))
            .save(path)?;
    }
    #[cfg(feature = "plot")]
    if opt.plot {
        let diagnostics = &decision.selected().analysis.diagnostics;
        grating_period::plot::spectra(diagnostics, format!("{stem}_spectra.png"))
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        grating_period::plot::rows(diagnostics, format!("{stem}_rows.png"))
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    Ok(())
}
