use statrs::statistics::Statistics;

use crate::EdaError;

/// Cumulative sum of deviations from the series mean.
///
/// The last value is zero up to rounding error.
pub fn cusum(values: &[f64]) -> Result<Vec<f64>, EdaError> {
    if values.is_empty() {
        return Err(EdaError::insufficient("cusum", 1, 0));
    }
    let mean = values.mean();
    Ok(values
        .iter()
        .scan(0.0, |total, value| {
            *total += value - mean;
            Some(*total)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_at_zero() {
        let values = [50.0, 51.0, 49.0, 52.5, 48.0, 47.0, 55.0, 60.0, 58.0, 54.0];
        let sums = cusum(&values).expect("non-empty");
        assert_eq!(sums.len(), values.len());
        assert!(sums[9].abs() < 1e-9);
        assert!((sums[0] - (50.0 - 52.45)).abs() < 1e-9);
    }

    #[test]
    fn rising_series_dips_then_recovers() {
        let sums = cusum(&[1.0, 2.0, 3.0, 4.0, 5.0]).expect("non-empty");
        assert_eq!(sums, vec![-2.0, -3.0, -3.0, -2.0, 0.0]);
    }
}
