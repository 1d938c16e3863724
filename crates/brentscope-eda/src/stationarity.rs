//! Augmented Dickey-Fuller unit-root test with a constant term.
//!
//! The lag order is chosen by AIC over `0..=maxlag` on a common sample,
//! with `maxlag = ceil(12 * (n / 100)^(1/4))`. p-values use MacKinnon's
//! (1994) response-surface approximation and critical values MacKinnon
//! (2010), both for the constant-only, single-series case.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::EdaError;

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.04];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    #[serde(rename = "1%")]
    pub one: f64,
    #[serde(rename = "5%")]
    pub five: f64,
    #[serde(rename = "10%")]
    pub ten: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    /// Observations in the final regression.
    pub nobs: usize,
    pub critical_values: CriticalValues,
    pub aic: f64,
}

impl AdfResult {
    pub fn is_stationary(&self, significance: f64) -> bool {
        self.p_value <= significance
    }
}

/// Stationarity verdict plus the differenced series when one was needed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Stationarity {
    Stationary { adf: AdfResult },
    /// `price_diff[0]` is missing; the rest are first differences.
    Differenced {
        adf: AdfResult,
        price_diff: Vec<Option<f64>>,
    },
}

impl Stationarity {
    pub fn adf(&self) -> &AdfResult {
        match self {
            Self::Stationary { adf } | Self::Differenced { adf, .. } => adf,
        }
    }
}

fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// MacKinnon approximate p-value for the constant-only ADF statistic.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &SMALL_P
    } else {
        &LARGE_P
    };
    let z = polyval(coefficients, statistic);
    Normal::new(0.0, 1.0).map(|n| n.cdf(z)).unwrap_or(f64::NAN)
}

pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs as f64;
    CriticalValues {
        one: polyval(&CRIT_1, inv),
        five: polyval(&CRIT_5, inv),
        ten: polyval(&CRIT_10, inv),
    }
}

pub fn default_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

struct Ols {
    coefficients: DVector<f64>,
    std_errors: DVector<f64>,
    aic: f64,
}

fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Ols, EdaError> {
    let (n, k) = x.shape();
    if n <= k {
        return Err(EdaError::insufficient("adf regression", k + 1, n));
    }
    let xtx = x.transpose() * x;
    let inverse = xtx
        .try_inverse()
        .ok_or_else(|| EdaError::numerical("adf", "singular design matrix"))?;
    let coefficients = &inverse * (x.transpose() * y);
    let residuals = y - x * &coefficients;
    let ssr = residuals.dot(&residuals);
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = inverse.diagonal().map(|v| (v * sigma2).max(0.0).sqrt());

    let nf = n as f64;
    let llf = -nf / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / nf).ln() + 1.0);
    let aic = -2.0 * llf + 2.0 * k as f64;

    Ok(Ols {
        coefficients,
        std_errors,
        aic,
    })
}

/// Design for `dx[t] = c + g * x[t-1] + sum_i b_i * dx[t-i] + e` using
/// `lags` lagged differences, over the last `rows` available targets.
fn adf_design(values: &[f64], diffs: &[f64], lags: usize, rows: usize) -> (DMatrix<f64>, DVector<f64>) {
    let start = diffs.len() - rows;
    let x = DMatrix::from_fn(rows, lags + 2, |r, c| {
        let t = start + r;
        match c {
            0 => 1.0,
            1 => values[t],
            lag => diffs[t - (lag - 1)],
        }
    });
    let y = DVector::from_fn(rows, |r, _| diffs[start + r]);
    (x, y)
}

/// ADF test, lag order chosen by AIC up to `max_lag` (default when `None`).
pub fn adf_test(values: &[f64], max_lag: Option<usize>) -> Result<AdfResult, EdaError> {
    let n = values.len();
    if n < 8 {
        return Err(EdaError::insufficient("adf", 8, n));
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let cap = (n / 2).saturating_sub(2);
    let max_lag = max_lag.unwrap_or_else(|| default_max_lag(n)).min(cap);

    let common_rows = diffs.len() - max_lag;
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let (x, y) = adf_design(values, &diffs, lag, common_rows);
        let fit = ols(&x, &y)?;
        if best.map_or(true, |(_, aic)| fit.aic < aic) {
            best = Some((lag, fit.aic));
        }
    }
    let (used_lag, _) = best.ok_or_else(|| EdaError::numerical("adf", "no lag order evaluated"))?;

    let rows = diffs.len() - used_lag;
    let (x, y) = adf_design(values, &diffs, used_lag, rows);
    let fit = ols(&x, &y)?;
    let statistic = fit.coefficients[1] / fit.std_errors[1];
    if !statistic.is_finite() {
        return Err(EdaError::numerical("adf", "test statistic is not finite"));
    }

    let result = AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs: rows,
        critical_values: mackinnon_critical_values(rows),
        aic: fit.aic,
    };
    debug!(
        statistic = result.statistic,
        p_value = result.p_value,
        used_lag,
        nobs = rows,
        "adf test"
    );
    Ok(result)
}

pub fn first_difference(values: &[f64]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(values.windows(2).map(|w| Some(w[1] - w[0])))
        .take(values.len())
        .collect()
}

/// Test and, if `p > significance`, first-difference the series.
pub fn check_stationarity(values: &[f64], significance: f64) -> Result<Stationarity, EdaError> {
    if !(significance > 0.0 && significance < 1.0) {
        return Err(EdaError::InvalidParameter {
            name: "significance",
            reason: format!("must be in (0, 1), got {significance}"),
        });
    }
    let adf = adf_test(values, None)?;
    if adf.is_stationary(significance) {
        Ok(Stationarity::Stationary { adf })
    } else {
        Ok(Stationarity::Differenced {
            adf,
            price_diff: first_difference(values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
            })
            .collect()
    }

    fn random_walk(n: usize) -> Vec<f64> {
        noise(n, 7)
            .into_iter()
            .scan(50.0, |level, step| {
                *level += step + 0.1;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn p_value_is_monotone_and_bounded() {
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
        let mut previous = 0.0;
        for i in 0..40 {
            let tau = -6.0 + 0.2 * f64::from(i);
            let p = mackinnon_p_value(tau);
            assert!((0.0..=1.0).contains(&p));
            assert!(p >= previous - 1e-12, "tau={tau}");
            previous = p;
        }
    }

    #[test]
    fn p_value_near_five_percent_critical_value() {
        let p = mackinnon_p_value(-2.8623);
        assert!((p - 0.05).abs() < 0.005, "p = {p}");
    }

    #[test]
    fn critical_values_approach_asymptotes() {
        let cv = mackinnon_critical_values(1_000_000);
        assert!((cv.one + 3.43035).abs() < 1e-4);
        assert!((cv.five + 2.86154).abs() < 1e-4);
        assert!((cv.ten + 2.56677).abs() < 1e-4);
        let small = mackinnon_critical_values(100);
        assert!(small.one < cv.one);
    }

    #[test]
    fn max_lag_rule() {
        assert_eq!(default_max_lag(100), 12);
        assert_eq!(default_max_lag(9011), 37);
    }

    #[test]
    fn white_noise_is_stationary() {
        let outcome = check_stationarity(&noise(500, 42), 0.05).expect("adf");
        assert!(matches!(outcome, Stationarity::Stationary { .. }));
        assert!(outcome.adf().p_value < 0.01);
    }

    #[test]
    fn random_walk_is_differenced() {
        let values = random_walk(400);
        match check_stationarity(&values, 0.05).expect("adf") {
            Stationarity::Differenced { adf, price_diff } => {
                assert!(adf.p_value > 0.05);
                assert_eq!(price_diff.len(), values.len());
                assert_eq!(price_diff[0], None);
                assert_eq!(price_diff.iter().flatten().count(), values.len() - 1);
                assert_eq!(price_diff[1], Some(values[1] - values[0]));
            }
            other => panic!("expected differencing, got {other:?}"),
        }
    }

    #[test]
    fn rejects_short_series() {
        assert!(matches!(
            adf_test(&[1.0, 2.0, 3.0], None),
            Err(EdaError::InsufficientData { .. })
        ));
    }
}
