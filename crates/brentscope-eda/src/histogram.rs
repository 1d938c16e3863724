use serde::Serialize;
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;

use crate::describe::{quantile_sorted, sorted_copy};
use crate::EdaError;

const KDE_GRID_POINTS: usize = 200;
const KDE_CUT: f64 = 3.0;

/// Equal-width histogram with summary markers and a kernel density estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `bins + 1` ascending edges; the last bin includes its right edge.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Absent for constant or single-value input.
    pub kde: Option<Kde>,
}

/// Gaussian KDE evaluated on an even grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kde {
    pub bandwidth: f64,
    pub grid: Vec<f64>,
    pub density: Vec<f64>,
}

pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram, EdaError> {
    if bins == 0 {
        return Err(EdaError::InvalidParameter {
            name: "bins",
            reason: "must be at least 1".into(),
        });
    }
    if values.is_empty() {
        return Err(EdaError::insufficient("histogram", 1, 0));
    }

    let sorted = sorted_copy(values);
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    let (low, high) = if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    };
    let width = (high - low) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| low + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for value in values {
        let index = (((value - low) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    Ok(Histogram {
        edges,
        counts,
        mean: values.mean(),
        median: quantile_sorted(&sorted, 0.5),
        min,
        max,
        kde: gaussian_kde(values),
    })
}

/// Scott's rule bandwidth `n^(-1/5) * std`, grid extending three bandwidths
/// past the data range.
pub fn gaussian_kde(values: &[f64]) -> Option<Kde> {
    if values.len() < 2 {
        return None;
    }
    let std = values.std_dev();
    if !(std.is_finite() && std > 0.0) {
        return None;
    }

    let n = values.len() as f64;
    let bandwidth = std * n.powf(-0.2);
    let kernel = Normal::new(0.0, 1.0).ok()?;

    let low = values.iter().copied().fold(f64::INFINITY, f64::min) - KDE_CUT * bandwidth;
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max) + KDE_CUT * bandwidth;
    let step = (high - low) / (KDE_GRID_POINTS - 1) as f64;

    let grid: Vec<f64> = (0..KDE_GRID_POINTS).map(|i| low + step * i as f64).collect();
    let density = grid
        .iter()
        .map(|x| {
            values
                .iter()
                .map(|v| kernel.pdf((x - v) / bandwidth))
                .sum::<f64>()
                / (n * bandwidth)
        })
        .collect();

    Some(Kde {
        bandwidth,
        grid,
        density,
    })
}
