use serde::Serialize;
use statrs::statistics::Statistics;

use crate::EdaError;

/// Summary statistics of a numeric column, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single observation.
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Quantile of sorted data by linear interpolation between closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn describe(values: &[f64]) -> Result<Summary, EdaError> {
    if values.is_empty() {
        return Err(EdaError::insufficient("describe", 1, 0));
    }

    let sorted = sorted_copy(values);
    let std = (values.len() > 1).then(|| round2(values.std_dev()));

    Ok(Summary {
        count: values.len(),
        mean: round2(values.mean()),
        std,
        min: round2(sorted[0]),
        q25: round2(quantile_sorted(&sorted, 0.25)),
        median: round2(quantile_sorted(&sorted, 0.5)),
        q75: round2(quantile_sorted(&sorted, 0.75)),
        max: round2(sorted[sorted.len() - 1]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_interpolated_quartiles() {
        let summary = describe(&[4.0, 1.0, 3.0, 2.0]).expect("non-empty");
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.std, Some(1.29));
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q25, 1.75);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.q75, 3.25);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn single_value_has_no_std() {
        let summary = describe(&[18.63]).expect("non-empty");
        assert_eq!(summary.std, None);
        assert_eq!(summary.median, 18.63);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            describe(&[]),
            Err(EdaError::InsufficientData { needed: 1, .. })
        ));
    }

    #[test]
    fn serializes_with_percentile_keys() {
        let value = serde_json::to_value(describe(&[1.0, 2.0]).expect("ok")).expect("json");
        assert_eq!(value["50%"], serde_json::json!(1.5));
    }
}
