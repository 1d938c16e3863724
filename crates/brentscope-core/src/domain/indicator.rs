use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Macroeconomic indicator identity: upstream code plus display column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Indicator {
    pub code: String,
    pub name: String,
}

impl Indicator {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ValidationError::EmptyIndicatorCode);
        }
        Ok(Self {
            code: code.trim().to_owned(),
            name: name.into(),
        })
    }

    /// World indicators studied against Brent by default.
    pub fn defaults() -> Vec<Self> {
        [
            ("NY.GDP.MKTP.KD.ZG", "GDP Growth (%)"),
            ("FP.CPI.TOTL.ZG", "Inflation Rate (%)"),
            ("SL.UEM.TOTL.ZS", "Unemployment Rate (%)"),
            ("PA.NUS.FCRF", "Exchange Rate (USD)"),
        ]
        .into_iter()
        .map(|(code, name)| Self {
            code: code.to_owned(),
            name: name.to_owned(),
        })
        .collect()
    }
}

/// Values of every indicator at one date, in indicator order.
pub type IndicatorRow = Vec<Option<f64>>;

/// Indicator observations keyed by date (annual at source).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    indicators: Vec<Indicator>,
    observations: BTreeMap<NaiveDate, IndicatorRow>,
}

impl IndicatorSeries {
    pub fn new(indicators: Vec<Indicator>) -> Self {
        Self {
            indicators,
            observations: BTreeMap::new(),
        }
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn column_names(&self) -> Vec<String> {
        self.indicators.iter().map(|ind| ind.name.clone()).collect()
    }

    pub fn observations(&self) -> &BTreeMap<NaiveDate, IndicatorRow> {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Set a single indicator value, creating an empty row for a new date.
    pub fn set_value(&mut self, date: NaiveDate, column: usize, value: Option<f64>) {
        let width = self.indicators.len();
        if column >= width {
            return;
        }
        let row = self
            .observations
            .entry(date)
            .or_insert_with(|| vec![None; width]);
        row[column] = value;
    }

    /// Keep observations inside the inclusive window.
    pub fn retain_window(&mut self, start: NaiveDate, end: NaiveDate) {
        self.observations.retain(|date, _| *date >= start && *date <= end);
    }
}

/// Indicator values on a contiguous daily calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyIndicatorSeries {
    pub indicators: Vec<Indicator>,
    pub rows: BTreeMap<NaiveDate, IndicatorRow>,
}

impl DailyIndicatorSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&IndicatorRow> {
        self.rows.get(&date)
    }
}

/// One row of the right-joined indicator/price dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub date: NaiveDate,
    pub indicators: IndicatorRow,
    pub price: f64,
}

/// Indicators joined onto the price calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedDataset {
    pub indicators: Vec<Indicator>,
    pub rows: Vec<MergedRow>,
}

impl MergedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in export order: indicators first, then `Price`.
    pub fn value_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.indicators.iter().map(|ind| ind.name.clone()).collect();
        columns.push(String::from(PRICE_COLUMN));
        columns
    }

    /// Values of a named column, `None` where the row has no value.
    pub fn column(&self, name: &str) -> Result<Vec<Option<f64>>, ValidationError> {
        if name == PRICE_COLUMN {
            return Ok(self.rows.iter().map(|row| Some(row.price)).collect());
        }

        let index = self
            .indicators
            .iter()
            .position(|ind| ind.name == name || ind.code == name)
            .ok_or_else(|| ValidationError::UnknownColumn {
                column: name.to_owned(),
                available: self.value_columns().join(", "),
            })?;

        Ok(self.rows.iter().map(|row| row.indicators[index]).collect())
    }
}

pub const PRICE_COLUMN: &str = "Price";
pub const DATE_COLUMN: &str = "Date";

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn set_value_fills_missing_columns_with_none() {
        let mut series = IndicatorSeries::new(Indicator::defaults());
        series.set_value(ymd(2000, 1, 1), 1, Some(2.5));
        let row = &series.observations()[&ymd(2000, 1, 1)];
        assert_eq!(row, &vec![None, Some(2.5), None, None]);
    }

    #[test]
    fn retain_window_is_inclusive() {
        let mut series = IndicatorSeries::new(vec![Indicator::new("X", "x").expect("valid")]);
        for year in 1985..=1990 {
            series.set_value(ymd(year, 1, 1), 0, Some(year as f64));
        }
        series.retain_window(ymd(1986, 1, 1), ymd(1989, 1, 1));
        let years: Vec<_> = series.observations().keys().map(|d| d.to_string()).collect();
        assert_eq!(years, vec!["1986-01-01", "1987-01-01", "1988-01-01", "1989-01-01"]);
    }

    #[test]
    fn unknown_column_lists_available_names() {
        let merged = MergedDataset {
            indicators: vec![Indicator::new("X", "Growth").expect("valid")],
            rows: Vec::new(),
        };
        let err = merged.column("Nope").expect_err("must fail");
        match err {
            ValidationError::UnknownColumn { available, .. } => {
                assert_eq!(available, "Growth, Price");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
