use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One daily Brent observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }
        Ok(Self { date, price })
    }
}

/// Date-indexed price series with strictly increasing dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

/// Outcome of normalising unordered observations into a [`PriceSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub series: PriceSeries,
    pub duplicates_dropped: usize,
}

impl PriceSeries {
    /// Build from points that already satisfy the ordering invariant.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ValidationError> {
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(ValidationError::UnorderedDates {
                    previous: pair[0].date.to_string(),
                    date: pair[1].date.to_string(),
                });
            }
        }
        Ok(Self { points })
    }

    /// Sort ascending by date and keep the first observation of each date.
    ///
    /// The sort is stable, so "first" means first in input order.
    pub fn normalize(mut points: Vec<PricePoint>) -> Normalized {
        points.sort_by_key(|point| point.date);
        let before = points.len();
        points.dedup_by_key(|point| point.date);
        let duplicates_dropped = before - points.len();

        Normalized {
            series: Self { points },
            duplicates_dropped,
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|point| point.date).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.price).collect()
    }
}
