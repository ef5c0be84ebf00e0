use clap::Parser;
use grating_period::DesignBenchmark;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "design-benchmark")]
#[command(about = "Benchmarks the threshold policies of the grating period results against the design periods")]
struct Args {
    /// Directory with the sample results (*_Results.json)
    results: PathBuf,
    /// Directory where the benchmarks are saved [default: the parent of the results directory]
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let benchmarks = DesignBenchmark::load(&args.results)?;
    let output = args.output.unwrap_or_else(|| {
        args.results
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| args.results.clone())
    });
    benchmarks.save(&output)?;
    log::info!("Benchmarks saved in {:?}", output);

    println!("Best threshold method of {} gratings:", benchmarks.best.len());
    for (grating, benchmark) in &benchmarks.best {
        println!(
            " - {:8}: {:12} {:8.3}nm ({})",
            grating,
            benchmark.method.to_string(),
            benchmark.difference_nm,
            benchmark.sample
        );
    }
    println!("Threshold method tally:");
    for (method, count) in benchmarks.tally() {
        println!(" - {:12}: {}", method.to_string(), count);
    }

    Ok(())
}
