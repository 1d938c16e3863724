//! # Domain Models
//!
//! Tabular time series studied by brentscope.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PriceSeries`] | Daily Brent prices, strictly increasing dates |
//! | [`IndicatorSeries`] | Annual macro indicators keyed by date |
//! | [`DailyIndicatorSeries`] | Indicators forward-filled onto a daily calendar |
//! | [`MergedDataset`] | Indicators right-joined onto the price calendar |
//!
//! Dates are plain calendar days ([`chrono::NaiveDate`]); every CSV written
//! by the toolkit uses ISO `YYYY-MM-DD`.

mod date;
mod indicator;
mod price;

pub use date::{format_iso, parse_market_date, ISO_DATE_FORMAT};
pub use indicator::{
    DailyIndicatorSeries, Indicator, IndicatorRow, IndicatorSeries, MergedDataset, MergedRow,
    DATE_COLUMN, PRICE_COLUMN,
};
pub use price::{Normalized, PricePoint, PriceSeries};
