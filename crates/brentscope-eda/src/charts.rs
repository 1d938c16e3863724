//! SVG chart rendering.
//!
//! Charts are drawn into an in-memory SVG string with plotters and written
//! to disk in one step. Dates are plotted as fractional years.

use std::fs;
use std::ops::Range;
use std::path::Path;

use brentscope_core::CorrelationMatrix;
use chrono::{Datelike, NaiveDate};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::correlogram::Correlogram;
use crate::decomposition::Decomposition;
use crate::histogram::Histogram;
use crate::EdaError;

const WIDE: (u32, u32) = (1000, 500);
const TALL: (u32, u32) = (1000, 1000);

fn draw_err(err: impl std::fmt::Display) -> String {
    err.to_string()
}

pub fn year_fraction(date: NaiveDate) -> f64 {
    f64::from(date.year()) + f64::from(date.ordinal0()) / 365.25
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (low, high) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !low.is_finite() {
        return 0.0..1.0;
    }
    if high - low < f64::EPSILON {
        return low - 1.0..high + 1.0;
    }
    let pad = (high - low) * 0.05;
    low - pad..high + pad
}

fn render<F>(path: &Path, size: (u32, u32), draw: F) -> Result<(), EdaError>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> Result<(), String>,
{
    let chart_error = |reason: String| EdaError::Chart {
        path: path.to_path_buf(),
        reason,
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err).map_err(chart_error)?;
        draw(&root).map_err(chart_error)?;
        root.present().map_err(draw_err).map_err(chart_error)?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| chart_error(err.to_string()))?;
    }
    fs::write(path, svg).map_err(|err| chart_error(err.to_string()))
}

fn line_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    points: &[(f64, f64)],
    color: RGBColor,
) -> Result<(), String> {
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(
            padded_range(points.iter().map(|p| p.0)),
            padded_range(points.iter().map(|p| p.1)),
        )
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x| format!("{x:.0}"))
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &color))
        .map_err(draw_err)?;
    Ok(())
}

fn dated(dates: &[NaiveDate], values: &[f64]) -> Vec<(f64, f64)> {
    dates
        .iter()
        .zip(values)
        .map(|(d, v)| (year_fraction(*d), *v))
        .collect()
}

fn dated_optional(dates: &[NaiveDate], values: &[Option<f64>]) -> Vec<(f64, f64)> {
    dates
        .iter()
        .zip(values)
        .filter_map(|(d, v)| v.map(|v| (year_fraction(*d), v)))
        .collect()
}

pub fn time_series(path: &Path, dates: &[NaiveDate], prices: &[f64]) -> Result<(), EdaError> {
    let points = dated(dates, prices);
    render(path, WIDE, |root| {
        line_panel(root, "Brent oil price (USD/bbl)", &points, BLUE)
    })
}

pub fn decomposition(path: &Path, dates: &[NaiveDate], parts: &Decomposition) -> Result<(), EdaError> {
    let observed = dated(dates, &parts.observed);
    let trend = dated_optional(dates, &parts.trend);
    let seasonal = dated(dates, &parts.seasonal);
    let resid = dated_optional(dates, &parts.resid);

    render(path, TALL, |root| {
        let panels = root.split_evenly((4, 1));
        line_panel(&panels[0], "Observed", &observed, BLUE)?;
        line_panel(&panels[1], "Trend", &trend, RED)?;
        line_panel(
            &panels[2],
            &format!("Seasonal (period {})", parts.period),
            &seasonal,
            GREEN,
        )?;
        line_panel(&panels[3], "Residual", &resid, BLACK)
    })
}

fn stem_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    coefficients: &[f64],
    band: f64,
) -> Result<(), String> {
    let lags = coefficients.len().max(1) as f64;
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..lags - 0.5, -1.1..1.1)
        .map_err(draw_err)?;
    chart.configure_mesh().x_desc("lag").draw().map_err(draw_err)?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(-0.5, -band), (lags - 0.5, band)],
            BLUE.mix(0.15).filled(),
        )))
        .map_err(draw_err)?;
    chart
        .draw_series(coefficients.iter().enumerate().map(|(lag, value)| {
            PathElement::new(vec![(lag as f64, 0.0), (lag as f64, *value)], BLUE.stroke_width(2))
        }))
        .map_err(draw_err)?;
    chart
        .draw_series(
            coefficients
                .iter()
                .enumerate()
                .map(|(lag, value)| Circle::new((lag as f64, *value), 3, BLUE.filled())),
        )
        .map_err(draw_err)?;
    Ok(())
}

pub fn correlogram(path: &Path, gram: &Correlogram) -> Result<(), EdaError> {
    render(path, TALL, |root| {
        let panels = root.split_evenly((2, 1));
        stem_panel(&panels[0], "Autocorrelation", &gram.acf, gram.confidence_band)?;
        stem_panel(&panels[1], "Partial autocorrelation", &gram.pacf, gram.confidence_band)
    })
}

/// Bars scaled to density so the KDE overlays them.
pub fn histogram(path: &Path, hist: &Histogram) -> Result<(), EdaError> {
    let total = hist.counts.iter().sum::<usize>().max(1) as f64;
    let bars: Vec<(f64, f64, f64)> = hist
        .edges
        .windows(2)
        .zip(&hist.counts)
        .map(|(edge, count)| {
            let width = edge[1] - edge[0];
            (edge[0], edge[1], *count as f64 / (total * width))
        })
        .collect();

    let x_range = padded_range(
        hist.edges
            .iter()
            .copied()
            .chain(hist.kde.iter().flat_map(|k| k.grid.iter().copied())),
    );
    let y_max = bars
        .iter()
        .map(|b| b.2)
        .chain(hist.kde.iter().flat_map(|k| k.density.iter().copied()))
        .fold(0.0, f64::max)
        .max(f64::EPSILON)
        * 1.1;

    render(path, WIDE, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Distribution of Brent prices", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, 0.0..y_max)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc("price")
            .y_desc("density")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(
                bars.iter()
                    .map(|(lo, hi, h)| Rectangle::new([(*lo, 0.0), (*hi, *h)], BLUE.mix(0.4).filled())),
            )
            .map_err(draw_err)?;

        if let Some(kde) = &hist.kde {
            chart
                .draw_series(LineSeries::new(
                    kde.grid.iter().copied().zip(kde.density.iter().copied()),
                    BLACK.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label("KDE")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], BLACK));
        }

        let markers = [
            ("mean", hist.mean, RED),
            ("median", hist.median, GREEN),
            ("min", hist.min, MAGENTA),
            ("max", hist.max, CYAN),
        ];
        for (name, x, color) in markers {
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x, 0.0), (x, y_max)],
                    color.stroke_width(2),
                )))
                .map_err(draw_err)?
                .label(format!("{name}: {x:.2}"))
                .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 15, ly)], color));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
        Ok(())
    })
}

pub fn cusum(path: &Path, dates: &[NaiveDate], sums: &[f64]) -> Result<(), EdaError> {
    let points = dated(dates, sums);
    render(path, WIDE, |root| {
        let x_range = padded_range(points.iter().map(|p| p.0));
        let mut chart = ChartBuilder::on(root)
            .caption("CUSUM of deviations from the mean", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(
                x_range.clone(),
                padded_range(points.iter().map(|p| p.1).chain(std::iter::once(0.0))),
            )
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_label_formatter(&|x| format!("{x:.0}"))
            .draw()
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
            .map_err(draw_err)?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x_range.start, 0.0), (x_range.end, 0.0)],
                RED.stroke_width(1),
            )))
            .map_err(draw_err)?;
        Ok(())
    })
}

pub fn change_points(
    path: &Path,
    dates: &[NaiveDate],
    prices: &[f64],
    boundaries: &[NaiveDate],
) -> Result<(), EdaError> {
    let points = dated(dates, prices);
    let marks: Vec<f64> = boundaries.iter().map(|d| year_fraction(*d)).collect();
    render(path, WIDE, |root| {
        let y_range = padded_range(points.iter().map(|p| p.1));
        let mut chart = ChartBuilder::on(root)
            .caption("Detected change points", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(60)
            .build_cartesian_2d(padded_range(points.iter().map(|p| p.0)), y_range.clone())
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_label_formatter(&|x| format!("{x:.0}"))
            .draw()
            .map_err(draw_err)?;
        chart
            .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
            .map_err(draw_err)?;
        chart
            .draw_series(marks.iter().map(|x| {
                PathElement::new(vec![(*x, y_range.start), (*x, y_range.end)], RED.stroke_width(1))
            }))
            .map_err(draw_err)?;
        Ok(())
    })
}

pub fn differenced(path: &Path, dates: &[NaiveDate], diff: &[Option<f64>]) -> Result<(), EdaError> {
    let points = dated_optional(dates, diff);
    render(path, WIDE, |root| {
        line_panel(root, "Differenced Brent price", &points, BLUE)
    })
}

fn heat_color(value: Option<f64>) -> RGBColor {
    match value {
        None => RGBColor(200, 200, 200),
        Some(v) if v >= 0.0 => {
            let fade = (255.0 * (1.0 - v.min(1.0))) as u8;
            RGBColor(255, fade, fade)
        }
        Some(v) => {
            let fade = (255.0 * (1.0 + v.max(-1.0))) as u8;
            RGBColor(fade, fade, 255)
        }
    }
}

pub fn correlation_heatmap(path: &Path, matrix: &CorrelationMatrix) -> Result<(), EdaError> {
    let k = matrix.columns.len() as i32;
    let columns = &matrix.columns;
    let name = move |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => columns
            .get(*i as usize)
            .cloned()
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };

    render(path, TALL, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption("Correlation matrix", ("sans-serif", 20))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(160)
            .build_cartesian_2d((0..k).into_segmented(), (0..k).into_segmented())
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(k.max(1) as usize)
            .y_labels(k.max(1) as usize)
            .x_label_formatter(&name)
            .y_label_formatter(&name)
            .draw()
            .map_err(draw_err)?;

        for (i, row) in matrix.values.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                let (x, y) = (j as i32, k - 1 - i as i32);
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [
                            (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                            (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                        ],
                        heat_color(*value).filled(),
                    )))
                    .map_err(draw_err)?;
                let label = value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".into());
                chart
                    .draw_series(std::iter::once(Text::new(
                        label,
                        (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                        ("sans-serif", 14),
                    )))
                    .map_err(draw_err)?;
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).expect("date");
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn time_series_writes_svg_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("prices.svg");
        let prices: Vec<f64> = (0..50).map(|i| 50.0 + f64::from(i).sin()).collect();
        time_series(&path, &dates(50), &prices).expect("renders");
        let svg = fs::read_to_string(&path).expect("written");
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline"));
    }

    #[test]
    fn heatmap_handles_missing_cells() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("corr.svg");
        let matrix = CorrelationMatrix {
            columns: vec!["GDP".into(), "Price".into()],
            values: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        };
        correlation_heatmap(&path, &matrix).expect("renders");
        assert!(fs::read_to_string(&path).expect("written").contains("n/a"));
    }

    #[test]
    fn year_fraction_is_monotone() {
        let d = dates(400);
        assert!(d.windows(2).all(|w| year_fraction(w[0]) < year_fraction(w[1])));
        assert_eq!(year_fraction(d[0]), 2020.0);
    }

    #[test]
    fn degenerate_ranges_are_widened() {
        assert_eq!(padded_range([3.0, 3.0].into_iter()), 2.0..4.0);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
    }
}
