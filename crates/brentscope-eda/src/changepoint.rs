//! Penalised change-point detection: PELT search over an RBF kernel cost.
//!
//! Candidate boundaries sit on a grid of multiples of `jump` (plus the series
//! end). Kernel sums are accumulated per grid bucket into an `m x m` block
//! matrix so the segment cost over any pair of grid boundaries is an O(1)
//! lookup in its 2D prefix sum, without materialising the `n x n` Gram matrix.

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::EdaError;

/// Pairwise distances beyond this many points are estimated on a strided
/// subsample when resolving `gamma`.
const GAMMA_SAMPLE_LIMIT: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeltConfig {
    pub penalty: f64,
    pub min_size: usize,
    pub jump: usize,
    /// RBF bandwidth; resolved from the median heuristic when `None`.
    pub gamma: Option<f64>,
}

impl Default for PeltConfig {
    fn default() -> Self {
        Self {
            penalty: 15.0,
            min_size: 2,
            jump: 5,
            gamma: None,
        }
    }
}

impl PeltConfig {
    fn validate(&self) -> Result<(), EdaError> {
        if !(self.penalty.is_finite() && self.penalty > 0.0) {
            return Err(EdaError::InvalidParameter {
                name: "penalty",
                reason: format!("must be finite and > 0, got {}", self.penalty),
            });
        }
        if self.min_size == 0 {
            return Err(EdaError::InvalidParameter {
                name: "min_size",
                reason: "must be at least 1".into(),
            });
        }
        if self.jump == 0 {
            return Err(EdaError::InvalidParameter {
                name: "jump",
                reason: "must be at least 1".into(),
            });
        }
        if let Some(gamma) = self.gamma {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(EdaError::InvalidParameter {
                    name: "gamma",
                    reason: format!("must be finite and > 0, got {gamma}"),
                });
            }
        }
        Ok(())
    }
}

/// Segment boundaries found by PELT.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePoints {
    /// End-exclusive segment ends, strictly increasing, last equals `n`.
    pub breakpoints: Vec<usize>,
    pub gamma: f64,
    pub penalty: f64,
}

impl ChangePoints {
    /// Boundaries strictly inside the series.
    pub fn interior(&self) -> &[usize] {
        let count = self.breakpoints.len().saturating_sub(1);
        &self.breakpoints[..count]
    }
}

/// `1 / median(|x_i - x_j|^2)` over distinct pairs; 1.0 when every pair
/// coincides.
pub fn median_heuristic_gamma(values: &[f64]) -> f64 {
    let stride = values.len().div_ceil(GAMMA_SAMPLE_LIMIT).max(1);
    let sample: Vec<f64> = values.iter().copied().step_by(stride).collect();

    let mut distances = Vec::with_capacity(sample.len() * sample.len().saturating_sub(1) / 2);
    for (i, a) in sample.iter().enumerate() {
        for b in &sample[i + 1..] {
            distances.push((a - b) * (a - b));
        }
    }
    if distances.is_empty() {
        return 1.0;
    }

    let middle = distances.len() / 2;
    let median = if distances.len() % 2 == 1 {
        *distances.select_nth_unstable_by(middle, f64::total_cmp).1
    } else {
        let upper = *distances.select_nth_unstable_by(middle, f64::total_cmp).1;
        let lower = distances[..middle]
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) / 2.0
    };

    if median > 0.0 && median.is_finite() {
        1.0 / median
    } else {
        1.0
    }
}

/// Kernel block sums over grid buckets with their 2D prefix.
struct KernelGrid {
    /// Grid boundaries in sample positions: `0, jump, 2*jump, ..., n`.
    boundaries: Vec<usize>,
    /// `prefix[[a, b]]` is the kernel sum over buckets `< a` times buckets `< b`.
    prefix: Array2<f64>,
}

impl KernelGrid {
    fn build(values: &[f64], jump: usize, gamma: f64) -> Self {
        let n = values.len();
        let mut boundaries: Vec<usize> = (0..n).step_by(jump).collect();
        boundaries.push(n);
        let buckets = boundaries.len() - 1;

        let mut blocks = Array2::<f64>::zeros((buckets, buckets));
        for i in 0..n {
            let bi = i / jump;
            blocks[[bi, bi]] += 1.0;
            for j in i + 1..n {
                let bj = j / jump;
                let delta = values[i] - values[j];
                let k = (-gamma * delta * delta).exp();
                blocks[[bi, bj]] += k;
                blocks[[bj, bi]] += k;
            }
        }

        let mut prefix = Array2::<f64>::zeros((buckets + 1, buckets + 1));
        for a in 0..buckets {
            for b in 0..buckets {
                prefix[[a + 1, b + 1]] =
                    blocks[[a, b]] + prefix[[a, b + 1]] + prefix[[a + 1, b]] - prefix[[a, b]];
            }
        }

        Self { boundaries, prefix }
    }

    /// RBF cost of the segment between grid boundaries `a < b`:
    /// `len - sum(K[s..e, s..e]) / len` (the diagonal of an RBF Gram is 1).
    fn cost(&self, a: usize, b: usize) -> f64 {
        let len = (self.boundaries[b] - self.boundaries[a]) as f64;
        let block = self.prefix[[b, b]] - self.prefix[[a, b]] - self.prefix[[b, a]]
            + self.prefix[[a, a]];
        (len - block / len).max(0.0)
    }
}

/// Run PELT with the RBF cost.
///
/// Returns end-exclusive breakpoints; a series with no detected change
/// yields `[n]`.
pub fn detect_change_points(values: &[f64], config: &PeltConfig) -> Result<ChangePoints, EdaError> {
    config.validate()?;
    let n = values.len();
    if n < config.min_size {
        return Err(EdaError::insufficient("change point analysis", config.min_size, n));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EdaError::numerical("change point analysis", "series contains non-finite values"));
    }

    let gamma = config.gamma.unwrap_or_else(|| median_heuristic_gamma(values));
    let grid = KernelGrid::build(values, config.jump, gamma);
    let targets = grid.boundaries.len() - 1;
    let beta = config.penalty;

    let mut f = vec![f64::INFINITY; targets + 1];
    let mut last = vec![usize::MAX; targets + 1];
    f[0] = -beta;
    last[0] = 0;

    let mut candidates = vec![0usize];
    let mut pruned = 0usize;

    for t in 1..=targets {
        let mut scored = Vec::with_capacity(candidates.len());
        let mut best = f64::INFINITY;
        let mut best_tau = usize::MAX;

        for &tau in &candidates {
            if grid.boundaries[t] - grid.boundaries[tau] < config.min_size || !f[tau].is_finite() {
                scored.push(None);
                continue;
            }
            let unpenalised = f[tau] + grid.cost(tau, t);
            scored.push(Some(unpenalised));
            let candidate = unpenalised + beta;
            if candidate < best {
                best = candidate;
                best_tau = tau;
            }
        }

        if best_tau != usize::MAX {
            f[t] = best;
            last[t] = best_tau;
        }

        let mut next = Vec::with_capacity(candidates.len() + 1);
        for (tau, score) in candidates.iter().zip(&scored) {
            match score {
                Some(score) if *score >= f[t] => pruned += 1,
                _ => next.push(*tau),
            }
        }
        if t < targets {
            next.push(t);
        }
        candidates = next;
    }

    if !f[targets].is_finite() {
        return Err(EdaError::numerical(
            "change point analysis",
            "no feasible segmentation under min_size and jump",
        ));
    }

    let mut breakpoints = vec![n];
    let mut cursor = targets;
    while cursor > 0 {
        let tau = last[cursor];
        if tau >= cursor {
            return Err(EdaError::numerical(
                "change point analysis",
                format!("invalid backtrack state at grid index {cursor}"),
            ));
        }
        if tau == 0 {
            break;
        }
        breakpoints.push(grid.boundaries[tau]);
        cursor = tau;
    }
    breakpoints.reverse();

    debug!(
        n,
        gamma,
        penalty = beta,
        candidates_pruned = pruned,
        change_points = breakpoints.len() - 1,
        "pelt finished"
    );

    Ok(ChangePoints {
        breakpoints,
        gamma,
        penalty: beta,
    })
}
