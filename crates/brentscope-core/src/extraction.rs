//! Indicator extraction pipeline.
//!
//! `fetch` → `resample_daily` → `merge` → export / correlation. Every step
//! returns a `Result`; callers decide whether a failure stops dependent
//! steps.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::{info, warn};

use crate::data_source::{DateWindow, ExtractionError, IndicatorRequest, IndicatorSource, Observation};
use crate::domain::{
    DailyIndicatorSeries, Indicator, IndicatorSeries, MergedDataset, MergedRow, PriceSeries,
};
use crate::ValidationError;

/// Fetches indicator series for one country from an [`IndicatorSource`].
#[derive(Clone)]
pub struct DataExtractor {
    source: Arc<dyn IndicatorSource>,
    country: String,
}

impl DataExtractor {
    pub fn new(source: Arc<dyn IndicatorSource>, country: impl Into<String>) -> Self {
        Self {
            source,
            country: country.into(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Observations of a single indicator inside the inclusive window.
    pub async fn fetch_indicator(
        &self,
        indicator: &Indicator,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, ExtractionError> {
        let window = DateWindow::new(start, end)?;
        let request = IndicatorRequest::new(indicator.clone(), self.country.clone(), window)?;
        let observations = self.source.observations(request).await?;
        info!(
            source = self.source.name(),
            indicator = %indicator.code,
            rows = observations.len(),
            "indicator fetched"
        );
        Ok(observations)
    }

    /// All indicators, merged by date into one series.
    ///
    /// Fails on the first indicator that cannot be fetched.
    pub async fn fetch(
        &self,
        indicators: &[Indicator],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<IndicatorSeries, ExtractionError> {
        if indicators.is_empty() {
            return Err(ValidationError::NoIndicators.into());
        }

        let mut series = IndicatorSeries::new(indicators.to_vec());
        for (column, indicator) in indicators.iter().enumerate() {
            for observation in self.fetch_indicator(indicator, start, end).await? {
                series.set_value(observation.date, column, observation.value);
            }
        }
        series.retain_window(start, end);

        info!(
            indicators = indicators.len(),
            rows = series.len(),
            start = %start,
            end = %end,
            "world data fetched"
        );
        Ok(series)
    }
}

/// Forward-fill annual rows onto a contiguous daily calendar.
///
/// The calendar runs from the first to the last observation. Each day takes
/// the row of the latest observation on or before it; values missing at
/// source stay missing.
pub fn resample_daily(series: &IndicatorSeries) -> DailyIndicatorSeries {
    let mut daily = DailyIndicatorSeries {
        indicators: series.indicators().to_vec(),
        ..DailyIndicatorSeries::default()
    };

    let observations = series.observations();
    let (Some((&first, _)), Some((&last, _))) =
        (observations.first_key_value(), observations.last_key_value())
    else {
        warn!("no indicator observations to resample");
        return daily;
    };

    let mut current = None;
    for day in first.iter_days().take_while(|day| *day <= last) {
        if let Some(row) = observations.get(&day) {
            current = Some(row);
        }
        if let Some(row) = current {
            daily.rows.insert(day, row.clone());
        }
    }

    info!(rows = daily.len(), first = %first, last = %last, "world data resampled to daily");
    daily
}

/// Right join of daily indicators onto the price calendar.
pub fn merge(daily: &DailyIndicatorSeries, prices: &PriceSeries) -> MergedDataset {
    merge_counting_unmatched(daily, prices).0
}

/// [`merge`], also returning how many price dates had no daily indicator row.
pub fn merge_counting_unmatched(
    daily: &DailyIndicatorSeries,
    prices: &PriceSeries,
) -> (MergedDataset, usize) {
    let width = daily.indicators.len();
    let mut unmatched = 0usize;

    let rows = prices
        .points()
        .iter()
        .map(|point| {
            let indicators = match daily.get(point.date) {
                Some(row) => row.clone(),
                None => {
                    unmatched += 1;
                    vec![None; width]
                }
            };
            MergedRow {
                date: point.date,
                indicators,
                price: point.price,
            }
        })
        .collect::<Vec<_>>();

    if unmatched > 0 {
        warn!(rows = unmatched, "price dates without indicator values");
    }
    info!(rows = rows.len(), "indicators merged onto price dates");

    let merged = MergedDataset {
        indicators: daily.indicators.clone(),
        rows,
    };
    (merged, unmatched)
}

/// Pairwise Pearson correlations over every value column of a merged dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `None` where fewer than two complete pairs exist or a column is constant.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Pearson correlation over rows where both columns have a value.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    if xs.len() < 2 {
        return None;
    }

    let covariance = xs.iter().covariance(ys.iter());
    let sx = xs.iter().std_dev();
    let sy = ys.iter().std_dev();
    if sx == 0.0 || sy == 0.0 || !covariance.is_finite() {
        return None;
    }
    Some((covariance / (sx * sy)).clamp(-1.0, 1.0))
}

pub fn correlation_matrix(merged: &MergedDataset) -> Result<CorrelationMatrix, ValidationError> {
    let columns = merged.value_columns();
    let data = columns
        .iter()
        .map(|name| merged.column(name))
        .collect::<Result<Vec<_>, _>>()?;

    let values = data
        .iter()
        .map(|a| data.iter().map(|b| pearson(a, b)).collect())
        .collect();

    Ok(CorrelationMatrix { columns, values })
}

/// Correlation between two named columns (indicator name, code or `Price`).
pub fn specific_correlation(
    merged: &MergedDataset,
    first: &str,
    second: &str,
) -> Result<Option<f64>, ValidationError> {
    let a = merged.column(first)?;
    let b = merged.column(second)?;
    let correlation = pearson(&a, &b);
    info!(first, second, correlation = ?correlation, "specific correlation");
    Ok(correlation)
}
