//! Behaviour tests for chronological splitting and forecast evaluation

use brentscope_model::{split, ArimaOrder, FittedModel, ModelBuilder, ModelError, ModelStrategy};
use brentscope_tests::*;

fn noisy_trend(n: usize) -> Vec<f64> {
    let mut seed = 21u64;
    (0..n)
        .map(|t| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((seed >> 11) as f64 / (1u64 << 53) as f64) - 0.5;
            40.0 + 0.2 * t as f64 + noise
        })
        .collect()
}

#[test]
fn split_keeps_order_and_floor_length() {
    let prices: Vec<f64> = shifted_prices(101).into_iter().map(|(_, p)| p).collect();

    let (train, test) = split(&prices, 0.8).expect("valid fraction");

    assert_eq!(train.len(), 80);
    assert_eq!(test.len(), 21);
    assert_eq!(train.last(), prices.get(79));
    assert_eq!(test.first(), prices.get(80));
}

#[test]
fn split_rejects_fractions_outside_the_unit_interval() {
    let data = [1.0, 2.0, 3.0];
    assert_eq!(split(&data, 0.0), Err(ModelError::InvalidFraction(0.0)));
    assert_eq!(split(&data, 1.5), Err(ModelError::InvalidFraction(1.5)));
    let (train, test) = split(&data, 1.0).expect("whole series");
    assert_eq!((train.len(), test.len()), (3, 0));
}

#[test]
fn arima_evaluation_tracks_a_trend() {
    let data = noisy_trend(300);
    let builder = ModelBuilder::default();

    let artifact = builder.evaluate(&data).expect("fits");

    assert_eq!((artifact.train_len, artifact.test_len), (240, 60));
    assert_eq!(artifact.forecast.len(), 60);
    assert!(artifact.r2 > 0.5, "r2 {}", artifact.r2);
    assert!(artifact.rmse < 5.0, "rmse {}", artifact.rmse);
    let FittedModel::Arima(model) = &artifact.model;
    assert_eq!(model.order, ArimaOrder::default());
}

#[test]
fn lstm_strategy_is_not_available() {
    let builder = ModelBuilder::default().with_strategy(ModelStrategy::Lstm);
    assert_eq!(
        builder.evaluate(&noisy_trend(50)),
        Err(ModelError::Unimplemented("LSTM"))
    );
}
