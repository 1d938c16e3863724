use serde::Serialize;
use statrs::statistics::Statistics;

use crate::EdaError;

/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.959_963_984_540_054;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlogram {
    /// ACF at lags `0..=acf.len() - 1`; `acf[0] == 1`.
    pub acf: Vec<f64>,
    /// PACF at lags `0..=pacf.len() - 1`; `pacf[0] == 1`.
    pub pacf: Vec<f64>,
    /// Half-width of the 95% white-noise band, `1.96 / sqrt(n)`.
    pub confidence_band: f64,
}

/// Autocorrelation with the biased (divide by `n`) autocovariance.
pub fn acf(values: &[f64], lags: usize) -> Result<Vec<f64>, EdaError> {
    let n = values.len();
    if n < 2 {
        return Err(EdaError::insufficient("acf", 2, n));
    }
    let mean = values.mean();
    let centred: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let c0 = centred.iter().map(|v| v * v).sum::<f64>() / n as f64;
    if c0 <= 0.0 || !c0.is_finite() {
        return Err(EdaError::numerical("acf", "series has zero variance"));
    }

    let max_lag = lags.min(n - 1);
    Ok((0..=max_lag)
        .map(|k| {
            let ck = centred[..n - k]
                .iter()
                .zip(&centred[k..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64;
            ck / c0
        })
        .collect())
}

/// Partial autocorrelation by Durbin-Levinson recursion on the ACF
/// (Yule-Walker estimates).
pub fn pacf_from_acf(acf: &[f64]) -> Result<Vec<f64>, EdaError> {
    let lags = acf.len().saturating_sub(1);
    let mut pacf = Vec::with_capacity(lags + 1);
    pacf.push(1.0);
    if lags == 0 {
        return Ok(pacf);
    }

    let mut phi = vec![acf[1]];
    let mut variance = 1.0 - acf[1] * acf[1];
    pacf.push(acf[1]);

    for k in 2..=lags {
        if variance <= f64::EPSILON {
            return Err(EdaError::numerical(
                "pacf",
                format!("innovation variance vanished at lag {k}"),
            ));
        }
        let numerator = acf[k]
            - phi
                .iter()
                .enumerate()
                .map(|(j, p)| p * acf[k - 1 - j])
                .sum::<f64>();
        let reflection = numerator / variance;

        let previous = phi.clone();
        for (j, slot) in phi.iter_mut().enumerate() {
            *slot = previous[j] - reflection * previous[k - 2 - j];
        }
        phi.push(reflection);
        variance *= 1.0 - reflection * reflection;
        pacf.push(reflection);
    }
    Ok(pacf)
}

/// ACF up to `lags` and PACF up to `min(lags, n / 2 - 1)`.
pub fn correlogram(values: &[f64], lags: usize) -> Result<Correlogram, EdaError> {
    let n = values.len();
    let acf = acf(values, lags)?;
    let pacf_lags = lags.min((n / 2).saturating_sub(1));
    let pacf = pacf_from_acf(&acf[..=pacf_lags.min(acf.len() - 1)])?;

    Ok(Correlogram {
        acf,
        pacf,
        confidence_band: Z_95 / (n as f64).sqrt(),
    })
}
