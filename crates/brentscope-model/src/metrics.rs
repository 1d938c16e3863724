use statrs::statistics::Statistics;

use crate::ModelError;

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<(), ModelError> {
    if y_true.len() != y_pred.len() {
        return Err(ModelError::LengthMismatch {
            what: "prediction",
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    Ok(())
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    check_lengths(y_true, y_pred)?;
    if y_true.len() < 2 {
        return Err(ModelError::InsufficientData {
            what: "r2 score",
            needed: 2,
            actual: y_true.len(),
        });
    }

    let mean = y_true.mean();
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> Result<f64, ModelError> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(ModelError::InsufficientData {
            what: "rmse",
            needed: 1,
            actual: 0,
        });
    }
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64;
    Ok(mse.sqrt())
}
