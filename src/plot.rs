//! Diagnostic figures of the grating analysis

use crate::aggregate::RowDiagnostic;
use plotters::prelude::*;
use std::{error::Error, path::Path};

type Curve = (String, Vec<(f64, f64)>);

fn draw_curves<P: AsRef<Path>>(
    curves: &[Curve],
    path: P,
    x_desc: &str,
    y_desc: &str,
) -> Result<(), Box<dyn Error>> {
    let points = || curves.iter().flat_map(|(_, xy)| xy.iter());
    let (x_min, x_max) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &(x, _)| {
        (a.min(x), b.max(x))
    });
    let (y_min, y_max) = points().fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &(_, y)| {
        (a.min(y), b.max(y))
    });
    if curves.is_empty() || x_min >= x_max || y_min > y_max {
        log::warn!("nothing to plot in {:?}", path.as_ref());
        return Ok(());
    }
    let y_margin = ((y_max - y_min) * 5e-2).max(1f64);

    let plot = BitMapBackend::new(path.as_ref(), (768, 512)).into_drawing_area();
    plot.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&plot)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(x_min..x_max, y_min - y_margin..y_max + y_margin)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    let mut colors = colorous::TABLEAU10.iter().cycle();
    for (key, xy) in curves {
        let color = colors.next().unwrap_or(&colorous::TABLEAU10[0]);
        let rgb = RGBColor(color.r, color.g, color.b);
        chart
            .draw_series(LineSeries::new(xy.iter().cloned(), &rgb))?
            .label(key)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &rgb));
    }
    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;
    plot.present()?;
    log::info!("{:?} saved", path.as_ref());
    Ok(())
}

/// Overlay of the spectra of the diagnostic rows, the DC bin is left out
pub fn spectra<P: AsRef<Path>>(diagnostics: &[RowDiagnostic], path: P) -> Result<(), Box<dyn Error>> {
    let curves: Vec<Curve> = diagnostics
        .iter()
        .map(|d| {
            (
                format!("row #{}", d.row_index),
                d.spectrum
                    .frequencies
                    .iter()
                    .cloned()
                    .zip(d.spectrum.magnitude.iter().cloned())
                    .skip(1)
                    .collect(),
            )
        })
        .collect();
    draw_curves(&curves, path, "Spatial frequency [1/pixel]", "Magnitude")
}

/// Overlay of the binarized diagnostic rows
pub fn rows<P: AsRef<Path>>(diagnostics: &[RowDiagnostic], path: P) -> Result<(), Box<dyn Error>> {
    let curves: Vec<Curve> = diagnostics
        .iter()
        .map(|d| {
            (
                format!("row #{}", d.row_index),
                d.row
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| (i as f64, v))
                    .collect(),
            )
        })
        .collect();
    draw_curves(&curves, path, "Pixel", "Intensity")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_plot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectra.png");
        spectra(&[], &path).unwrap();
        rows(&[], &path).unwrap();
        assert!(!path.exists());
    }
}
