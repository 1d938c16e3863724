//! Behaviour tests for the exploratory analysis battery

use brentscope_eda::cusum::cusum;
use brentscope_eda::stationarity::check_stationarity;
use brentscope_eda::{detect_change_points, BrentEda, EdaError, PeltConfig, Stationarity};
use brentscope_tests::*;

fn loaded(rows: &[(chrono::NaiveDate, f64)]) -> (tempfile::TempDir, BrentEda) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("BrentOilprices.csv");
    write_price_csv(&path, rows);
    let mut eda = BrentEda::new(path);
    eda.load().expect("loads");
    (dir, eda)
}

// =============================================================================
// Loading and formatting
// =============================================================================

#[test]
fn formatting_twice_leaves_the_series_unchanged() {
    let (_dir, mut eda) = loaded(&shifted_prices(40));

    let first = eda.format_date().expect("formats").clone();
    let second = eda.format_date().expect("formats again").clone();

    assert_eq!(first, second);
    assert_eq!(first.len(), 40);
    assert!(first.dates().windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn analyses_before_formatting_are_rejected() {
    let (_dir, eda) = loaded(&shifted_prices(5));
    assert!(matches!(eda.describe(), Err(EdaError::NotFormatted)));
    assert!(matches!(eda.cusum(), Err(EdaError::NotFormatted)));
}

// =============================================================================
// CUSUM
// =============================================================================

#[test]
fn cusum_of_ten_rows_returns_to_zero() {
    let rows: Vec<_> = shifted_prices(10);
    let (_dir, mut eda) = loaded(&rows);
    eda.format_date().expect("formats");

    let sums = eda.cusum().expect("cusum");

    assert_eq!(sums.len(), 10);
    assert!(sums[9].abs() < 1e-9, "final value {}", sums[9]);
}

#[test]
fn cusum_of_a_constant_series_is_flat() {
    assert_eq!(cusum(&[5.0; 4]).expect("non-empty"), vec![0.0; 4]);
}

// =============================================================================
// Change points
// =============================================================================

#[test]
fn change_points_are_increasing_bounded_and_end_at_n() {
    let prices: Vec<f64> = shifted_prices(200).into_iter().map(|(_, p)| p).collect();

    let found = detect_change_points(&prices, &PeltConfig::default()).expect("detects");

    assert_eq!(found.breakpoints.last(), Some(&200));
    assert!(found.breakpoints.windows(2).all(|w| w[0] < w[1]));
    assert!(found.breakpoints.iter().all(|bp| *bp > 0 && *bp <= 200));
    assert!(found.interior().iter().any(|bp| (95..=105).contains(bp)));
}

#[test]
fn change_point_report_dates_match_breakpoints() {
    let rows = shifted_prices(200);
    let (_dir, mut eda) = loaded(&rows);
    eda.format_date().expect("formats");

    let report = eda.change_point_analysis().expect("analysis");

    assert_eq!(report.dates.len(), report.breakpoints.len());
    for (bp, date) in report.breakpoints.iter().zip(&report.dates) {
        assert_eq!(*date, rows[bp - 1].0);
    }
}

// =============================================================================
// Stationarity
// =============================================================================

#[test]
fn differenced_column_has_one_leading_gap() {
    // Random walk with drift: non-stationary in levels.
    let mut seed = 3u64;
    let mut level = 50.0;
    let walk: Vec<f64> = (0..400)
        .map(|_| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            level += 0.1 + ((seed >> 11) as f64 / (1u64 << 53) as f64) - 0.5;
            level
        })
        .collect();

    match check_stationarity(&walk, 0.05).expect("adf runs") {
        Stationarity::Differenced { price_diff, .. } => {
            assert_eq!(price_diff.len(), walk.len());
            assert_eq!(price_diff[0], None);
            assert!(price_diff[1..].iter().all(Option::is_some));
            let expected = walk[1] - walk[0];
            assert!((price_diff[1].expect("present") - expected).abs() < 1e-12);
        }
        Stationarity::Stationary { adf } => panic!("random walk judged stationary: {adf:?}"),
    }
}

#[test]
fn full_battery_with_charts() {
    let (dir, mut eda) = loaded(&shifted_prices(300));
    let charts = dir.path().join("charts");
    let mut eda = {
        eda.format_date().expect("formats");
        eda.with_charts_dir(&charts)
    };

    let report = eda.run_all();

    assert!(report.failures().is_empty(), "{:?}", report.failures());
    for chart in ["time_series", "seasonal_decomposition", "acf_pacf", "histogram", "cusum", "change_points"] {
        assert!(charts.join(format!("{chart}.svg")).exists(), "{chart} missing");
    }
}
