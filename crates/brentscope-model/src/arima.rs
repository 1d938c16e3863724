//! ARIMA(p, d, q) estimated by conditional sum of squares.
//!
//! The series is differenced `d` times and an ARMA(p, q) with optional
//! intercept is fitted to the result:
//!
//! ```text
//! y[t] = c + phi_1 y[t-1] + ... + phi_p y[t-p] + e[t] + theta_1 e[t-1] + ... + theta_q e[t-q]
//! ```
//!
//! Starting values come from the Hannan-Rissanen two-stage regression; they
//! are refined by Gauss-Newton on the residual sum of squares with
//! pre-sample residuals fixed at zero. AR and MA coefficients are kept
//! inside `[-0.999, 0.999]`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ModelError;

const MAX_AR_ORDER: usize = 10;
const MAX_DIFFERENCE: usize = 2;
const MAX_MA_ORDER: usize = 10;
const COEFFICIENT_BOUND: f64 = 0.999;
const MAX_ITERATIONS: usize = 100;
const MAX_HALVINGS: usize = 30;
const TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 1, d: 1, q: 1 }
    }
}

impl From<(usize, usize, usize)> for ArimaOrder {
    fn from((p, d, q): (usize, usize, usize)) -> Self {
        Self { p, d, q }
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

impl ArimaOrder {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.p > MAX_AR_ORDER {
            return Err(ModelError::InvalidOrder(format!(
                "AR order must be <= {MAX_AR_ORDER}, got {}",
                self.p
            )));
        }
        if self.d > MAX_DIFFERENCE {
            return Err(ModelError::InvalidOrder(format!(
                "differencing order must be <= {MAX_DIFFERENCE}, got {}",
                self.d
            )));
        }
        if self.q > MAX_MA_ORDER {
            return Err(ModelError::InvalidOrder(format!(
                "MA order must be <= {MAX_MA_ORDER}, got {}",
                self.q
            )));
        }
        Ok(())
    }

    /// Observations needed before differencing.
    pub fn min_observations(&self) -> usize {
        self.p + self.d + self.q + 10
    }
}

pub fn difference(values: &[f64], order: usize) -> Vec<f64> {
    let mut current = values.to_vec();
    for _ in 0..order {
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// Parameter layout: `[c?, phi_1..phi_p, theta_1..theta_q]`.
#[derive(Debug, Clone, Copy)]
struct Layout {
    constant: bool,
    p: usize,
    q: usize,
}

impl Layout {
    fn len(&self) -> usize {
        usize::from(self.constant) + self.p + self.q
    }

    fn ar_offset(&self) -> usize {
        usize::from(self.constant)
    }

    fn ma_offset(&self) -> usize {
        self.ar_offset() + self.p
    }

    fn one_step(&self, params: &[f64], y: &[f64], e: &[f64], t: usize) -> f64 {
        let c = if self.constant { params[0] } else { 0.0 };
        let ar: f64 = (1..=self.p)
            .map(|i| params[self.ar_offset() + i - 1] * y[t - i])
            .sum();
        let ma: f64 = (1..=self.q)
            .filter(|j| *j <= t)
            .map(|j| params[self.ma_offset() + j - 1] * e[t - j])
            .sum();
        c + ar + ma
    }

    /// Residuals over the whole series, zero before index `p`.
    fn residuals(&self, params: &[f64], y: &[f64]) -> Vec<f64> {
        let mut e = vec![0.0; y.len()];
        for t in self.p..y.len() {
            e[t] = y[t] - self.one_step(params, y, &e, t);
        }
        e
    }

    fn css(&self, params: &[f64], y: &[f64]) -> f64 {
        self.residuals(params, y)[self.p..].iter().map(|e| e * e).sum()
    }

    fn clamp(&self, params: &mut [f64]) {
        for value in &mut params[self.ar_offset()..] {
            *value = value.clamp(-COEFFICIENT_BOUND, COEFFICIENT_BOUND);
        }
    }
}

fn least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let xt = x.transpose();
    (&xt * x)
        .cholesky()
        .map(|chol| chol.solve(&(&xt * y)))
        .filter(|beta| beta.iter().all(|b| b.is_finite()))
}

/// Hannan-Rissanen: long AR for residual proxies, then OLS on lagged values
/// and lagged proxies.
fn initial_params(layout: Layout, y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mut params = vec![0.0; layout.len()];

    let proxies = if layout.q > 0 {
        let m = (layout.p + layout.q + 4).min(n / 4).max(1);
        let rows = n.saturating_sub(m);
        let x = DMatrix::from_fn(rows, m + 1, |r, c| if c == 0 { 1.0 } else { y[m + r - c] });
        let target = DVector::from_fn(rows, |r, _| y[m + r]);
        least_squares(&x, &target).map(|beta| {
            let mut e = vec![0.0; n];
            for t in m..n {
                let fitted: f64 = beta[0] + (1..=m).map(|i| beta[i] * y[t - i]).sum::<f64>();
                e[t] = y[t] - fitted;
            }
            (m, e)
        })
    } else {
        Some((0, vec![0.0; n]))
    };

    let Some((m, e)) = proxies else {
        return params;
    };

    let start = m + layout.p.max(layout.q);
    if start + layout.len() >= n {
        return params;
    }
    let rows = n - start;
    let x = DMatrix::from_fn(rows, layout.len(), |r, c| {
        let t = start + r;
        if layout.constant && c == 0 {
            1.0
        } else if c < layout.ma_offset() {
            y[t - (c - layout.ar_offset() + 1)]
        } else {
            e[t - (c - layout.ma_offset() + 1)]
        }
    });
    let target = DVector::from_fn(rows, |r, _| y[start + r]);
    if let Some(beta) = least_squares(&x, &target) {
        params.copy_from_slice(beta.as_slice());
    }
    layout.clamp(&mut params);
    params
}

fn jacobian(layout: Layout, params: &[f64], y: &[f64], base: &[f64]) -> DMatrix<f64> {
    let rows = base.len();
    let mut jac = DMatrix::zeros(rows, params.len());
    let mut shifted = params.to_vec();
    for k in 0..params.len() {
        let h = 1e-6 * params[k].abs().max(1.0);
        shifted[k] = params[k] + h;
        let bumped = layout.residuals(&shifted, y);
        for (r, (b, e)) in bumped[layout.p..].iter().zip(base).enumerate() {
            jac[(r, k)] = (b - e) / h;
        }
        shifted[k] = params[k];
    }
    jac
}

/// A fitted ARIMA model ready to forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArimaModel {
    pub order: ArimaOrder,
    pub constant: Option<f64>,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Residual variance `css / nobs`.
    pub sigma2: f64,
    pub css: f64,
    pub nobs: usize,
    pub iterations: usize,
    pub converged: bool,
    #[serde(skip)]
    differenced: Vec<f64>,
    #[serde(skip)]
    residuals: Vec<f64>,
    /// Last value at each differencing level `0..d`.
    #[serde(skip)]
    tails: Vec<f64>,
}

impl ArimaModel {
    pub fn fit(series: &[f64], order: ArimaOrder, include_constant: bool) -> Result<Self, ModelError> {
        order.validate()?;
        if series.len() < order.min_observations() {
            return Err(ModelError::InsufficientData {
                what: "arima fit",
                needed: order.min_observations(),
                actual: series.len(),
            });
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let tails: Vec<f64> = (0..order.d)
            .filter_map(|level| difference(series, level).last().copied())
            .collect();
        let y = difference(series, order.d);
        let layout = Layout {
            constant: include_constant,
            p: order.p,
            q: order.q,
        };

        let mut params = initial_params(layout, &y);
        let mut css = layout.css(&params, &y);
        if !css.is_finite() {
            return Err(ModelError::Estimation("initial residuals are not finite".into()));
        }
        debug!(?params, css, "hannan-rissanen start");

        let mut iterations = 0;
        let mut converged = false;
        while iterations < MAX_ITERATIONS {
            iterations += 1;
            let base = layout.residuals(&params, &y)[layout.p..].to_vec();
            let jac = jacobian(layout, &params, &y, &base);
            let mut normal = jac.transpose() * &jac;
            for k in 0..params.len() {
                normal[(k, k)] += 1e-10 * (1.0 + normal[(k, k)]);
            }
            let gradient = jac.transpose() * DVector::from_vec(base);
            let Some(step) = normal.cholesky().map(|chol| -chol.solve(&gradient)) else {
                break;
            };

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_HALVINGS {
                let mut candidate: Vec<f64> = params
                    .iter()
                    .zip(step.iter())
                    .map(|(p, s)| p + scale * s)
                    .collect();
                layout.clamp(&mut candidate);
                let candidate_css = layout.css(&candidate, &y);
                if candidate_css.is_finite() && candidate_css < css {
                    accepted = Some((candidate, candidate_css));
                    break;
                }
                scale *= 0.5;
            }

            let Some((candidate, candidate_css)) = accepted else {
                converged = true;
                break;
            };
            let improvement = css - candidate_css;
            params = candidate;
            css = candidate_css;
            if improvement <= TOLERANCE * css.max(f64::MIN_POSITIVE) {
                converged = true;
                break;
            }
        }

        let residuals = layout.residuals(&params, &y);
        let nobs = y.len() - layout.p;
        let model = Self {
            order,
            constant: include_constant.then(|| params[0]),
            ar: params[layout.ar_offset()..layout.ma_offset()].to_vec(),
            ma: params[layout.ma_offset()..].to_vec(),
            sigma2: css / nobs as f64,
            css,
            nobs,
            iterations,
            converged,
            differenced: y,
            residuals,
            tails,
        };
        info!(
            order = %model.order,
            ar = ?model.ar,
            ma = ?model.ma,
            sigma2 = model.sigma2,
            iterations,
            converged,
            "arima fitted"
        );
        Ok(model)
    }

    fn layout(&self) -> Layout {
        Layout {
            constant: self.constant.is_some(),
            p: self.order.p,
            q: self.order.q,
        }
    }

    fn params(&self) -> Vec<f64> {
        self.constant
            .iter()
            .chain(&self.ar)
            .chain(&self.ma)
            .copied()
            .collect()
    }

    /// Point forecasts for the next `steps` periods on the original scale.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let layout = self.layout();
        let params = self.params();
        let mut y = self.differenced.clone();
        let mut e = self.residuals.clone();
        for _ in 0..steps {
            let t = y.len();
            let next = layout.one_step(&params, &y, &e, t);
            y.push(next);
            e.push(0.0);
        }

        let mut forecast = y.split_off(self.differenced.len());
        for tail in self.tails.iter().rev() {
            let mut level = *tail;
            for value in &mut forecast {
                level += *value;
                *value = level;
            }
        }
        forecast
    }
}
