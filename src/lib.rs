/*!
# Grating Period

Extraction of the period of nanofabricated diffraction gratings from
Scanning Electron Microscope (SEM) images.

Each row of the grating region of the image is Fourier transformed and the
most prominent peaks of the spectrum are converted into physical periods
using the pixel calibration of the SEM log.
The periods are averaged over all the rows, for several row binarization
policies, and the policy that best matches the design period of the grating
is retained.

## Key Components

- [`SemParameters`] - SEM acquisition parameters and pixel calibration
- [`Roi`] - Grating region of the SEM image
- [`GratingAnalysis`] - Row to sample aggregation of the grating periods for a threshold policy
- [`ThresholdOptimizer`] - Threshold policy selection against the design period
- [`LineWidths`] - Line and space widths, and fill factor, of the grating
- [`BatchAnalysis`] - Analysis of a directory of samples
- [`DesignBenchmark`] - Threshold policy benchmark of the sample results

## Usage

```rust,no_run
use grating_period::{AnalysisConfig, Roi, SemParameters, ThresholdOptimizer};

let parameters = SemParameters::load("A1_G2_01.txt")?;
let roi = Roi::load("A1_G2_01.bmp", parameters.image_height, parameters.image_width)?;
let micrometers_per_pixel = parameters.calibration()?.micrometers_per_pixel();
let decision = ThresholdOptimizer::new(&roi, micrometers_per_pixel)
    .config(AnalysisConfig::default().num_peaks(3))
    .optimize(340f64)?;
println!(
    "{:.1}+/-{:.1}nm",
    decision.grating_period_nm(),
    decision.period_error_nm()
);
# Ok::<(), grating_period::Error>(())
```
*/

pub mod aggregate;
pub mod batch;
pub mod benchmark;
pub mod calibration;
pub mod config;
mod error;
pub mod fill_factor;
pub mod optimizer;
pub mod peaks;
pub mod period;
#[cfg(feature = "plot")]
pub mod plot;
pub mod results;
pub mod roi;
pub mod semlog;
pub mod spectrum;
pub mod stats;
pub mod threshold;

pub use aggregate::{Analysis, GratingAnalysis, RowDiagnostic, SampleAggregate};
pub use batch::{BatchAnalysis, BatchAverage, BatchReport, BatchSummary, SampleAnalysis};
pub use benchmark::{Benchmark, DesignBenchmark};
pub use calibration::{Calibration, DistanceUnit};
pub use config::{AnalysisConfig, DesignPeriods};
pub use error::{error_chain, Error};
pub use fill_factor::{FillFactor, LineWidths};
pub use optimizer::{SampleDecision, ThresholdOptimizer};
pub use results::SampleRecord;
pub use roi::Roi;
pub use semlog::{SemLog, SemParameters};
pub use spectrum::{RowAnalyzer, Spectrum};
pub use threshold::ThresholdPolicy;
