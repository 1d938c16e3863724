use crate::ModelError;

/// Chronological train/test split at `floor(len * train_fraction)`.
///
/// No shuffling; `train_fraction` must lie in `(0, 1]`.
pub fn split<T>(data: &[T], train_fraction: f64) -> Result<(&[T], &[T]), ModelError> {
    if !(train_fraction > 0.0 && train_fraction <= 1.0) {
        return Err(ModelError::InvalidFraction(train_fraction));
    }
    let cut = ((data.len() as f64) * train_fraction).floor() as usize;
    Ok(data.split_at(cut.min(data.len())))
}
