//! Classical additive decomposition.
//!
//! `observed = trend + seasonal + resid`. The trend is a centred moving
//! average of one period (a `2 x period` average when the period is even),
//! so `period / 2` values at each end have no trend or residual. The
//! seasonal component is the per-position mean of the detrended series,
//! centred to sum to zero over one period.

use serde::Serialize;

use crate::EdaError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decomposition {
    pub period: usize,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub resid: Vec<Option<f64>>,
}

fn trend_filter(period: usize) -> Vec<f64> {
    let weight = 1.0 / period as f64;
    if period % 2 == 0 {
        let mut filter = vec![weight; period + 1];
        filter[0] = 0.5 * weight;
        filter[period] = 0.5 * weight;
        filter
    } else {
        vec![weight; period]
    }
}

pub fn seasonal_decompose(values: &[f64], period: usize) -> Result<Decomposition, EdaError> {
    if period < 2 {
        return Err(EdaError::InvalidParameter {
            name: "period",
            reason: format!("must be at least 2, got {period}"),
        });
    }
    let n = values.len();
    if n < 2 * period {
        return Err(EdaError::insufficient("seasonal decomposition", 2 * period, n));
    }

    let filter = trend_filter(period);
    let half = filter.len() / 2;

    let trend: Vec<Option<f64>> = (0..n)
        .map(|i| {
            (i >= half && i + half < n).then(|| {
                filter
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * values[i + k - half])
                    .sum()
            })
        })
        .collect();

    let detrended: Vec<Option<f64>> = values
        .iter()
        .zip(&trend)
        .map(|(x, t)| t.map(|t| x - t))
        .collect();

    let mut position_means = vec![0.0; period];
    for (position, slot) in position_means.iter_mut().enumerate() {
        let (sum, count) = detrended
            .iter()
            .skip(position)
            .step_by(period)
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        *slot = if count > 0 { sum / count as f64 } else { 0.0 };
    }
    let centre = position_means.iter().sum::<f64>() / period as f64;
    for slot in &mut position_means {
        *slot -= centre;
    }

    let seasonal: Vec<f64> = (0..n).map(|i| position_means[i % period]).collect();
    let resid = detrended
        .iter()
        .zip(&seasonal)
        .map(|(d, s)| d.map(|d| d - s))
        .collect();

    Ok(Decomposition {
        period,
        observed: values.to_vec(),
        trend,
        seasonal,
        resid,
    })
}
