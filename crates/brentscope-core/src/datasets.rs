//! Conversions between the project CSV files and domain series.
//!
//! | File | Columns |
//! |------|---------|
//! | `BrentOilprices.csv` | `Date`, `Price` |
//! | `world_data.csv` | `date`, one column per indicator name |
//! | `merged_data.csv` | `Date`, one column per indicator name, `Price` |

use std::path::Path;

use tracing::{info, warn};

use crate::domain::{
    format_iso, parse_market_date, Indicator, IndicatorSeries, MergedDataset, MergedRow,
    PricePoint, PriceSeries, DATE_COLUMN, PRICE_COLUMN,
};
use crate::table::{format_cell, parse_number, CsvTable};
use crate::TableError;

/// Date column header used by `world_data.csv`.
pub const WORLD_DATE_COLUMN: &str = "date";

/// Price rows parsed out of a raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPrices {
    pub series: PriceSeries,
    pub invalid_dates: usize,
    pub invalid_prices: usize,
    pub duplicates_dropped: usize,
}

impl ParsedPrices {
    pub fn rows_dropped(&self) -> usize {
        self.invalid_dates + self.invalid_prices + self.duplicates_dropped
    }
}

/// Parse the `Date`/`Price` columns of a raw table into a clean series.
///
/// Rows whose date or price cannot be parsed are dropped; the result is
/// sorted ascending with duplicate dates removed.
pub fn parse_price_table(table: &CsvTable, path: &Path) -> Result<ParsedPrices, TableError> {
    let date_col = table.require_column(DATE_COLUMN, path)?;
    let price_col = table.require_column(PRICE_COLUMN, path)?;

    let mut points = Vec::with_capacity(table.len());
    let mut invalid_dates = 0usize;
    let mut invalid_prices = 0usize;

    for row in 0..table.len() {
        let raw_date = table.cell(row, date_col).unwrap_or("");
        let Ok(date) = parse_market_date(raw_date) else {
            invalid_dates += 1;
            continue;
        };
        let Some(price) = table.cell(row, price_col).and_then(parse_number) else {
            invalid_prices += 1;
            continue;
        };
        match PricePoint::new(date, price) {
            Ok(point) => points.push(point),
            Err(_) => invalid_prices += 1,
        }
    }

    let normalized = PriceSeries::normalize(points);
    Ok(ParsedPrices {
        series: normalized.series,
        invalid_dates,
        invalid_prices,
        duplicates_dropped: normalized.duplicates_dropped,
    })
}

/// Read and clean a price CSV, logging how many rows were discarded.
pub fn read_prices(path: &Path) -> Result<ParsedPrices, TableError> {
    let table = CsvTable::read(path)?;
    let parsed = parse_price_table(&table, path)?;

    if parsed.invalid_dates > 0 {
        warn!(
            path = %path.display(),
            rows = parsed.invalid_dates,
            "dropped rows with invalid dates"
        );
    }
    if parsed.invalid_prices > 0 {
        warn!(
            path = %path.display(),
            rows = parsed.invalid_prices,
            "dropped rows with non-numeric prices"
        );
    }
    if parsed.duplicates_dropped > 0 {
        warn!(
            path = %path.display(),
            rows = parsed.duplicates_dropped,
            "dropped duplicate dates"
        );
    }
    info!(path = %path.display(), rows = parsed.series.len(), "oil prices loaded");

    Ok(parsed)
}

pub fn price_table(series: &PriceSeries) -> CsvTable {
    let mut table = CsvTable::new(vec![DATE_COLUMN.to_owned(), PRICE_COLUMN.to_owned()]);
    table.rows = series
        .points()
        .iter()
        .map(|point| vec![format_iso(point.date), point.price.to_string()])
        .collect();
    table
}

pub fn world_data_table(series: &IndicatorSeries) -> CsvTable {
    let mut headers = vec![WORLD_DATE_COLUMN.to_owned()];
    headers.extend(series.column_names());

    let mut table = CsvTable::new(headers);
    table.rows = series
        .observations()
        .iter()
        .map(|(date, values)| {
            let mut row = Vec::with_capacity(values.len() + 1);
            row.push(format_iso(*date));
            row.extend(values.iter().map(|value| format_cell(*value)));
            row
        })
        .collect();
    table
}

pub fn merged_table(merged: &MergedDataset) -> CsvTable {
    let mut headers = vec![DATE_COLUMN.to_owned()];
    headers.extend(merged.value_columns());

    let mut table = CsvTable::new(headers);
    table.rows = merged
        .rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(row.indicators.len() + 2);
            cells.push(format_iso(row.date));
            cells.extend(row.indicators.iter().map(|value| format_cell(*value)));
            cells.push(row.price.to_string());
            cells
        })
        .collect();
    table
}

/// Rebuild a merged dataset from `merged_data.csv`.
///
/// Every column other than `Date` and `Price` is an indicator named by its
/// header. Rows without a valid date or price are skipped.
pub fn parse_merged_table(table: &CsvTable, path: &Path) -> Result<MergedDataset, TableError> {
    let date_col = table.require_column(DATE_COLUMN, path)?;
    let price_col = table.require_column(PRICE_COLUMN, path)?;

    let (columns, indicators): (Vec<usize>, Vec<Indicator>) = table
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != date_col && *index != price_col)
        .filter_map(|(index, header)| {
            Indicator::new(header.clone(), header.clone())
                .ok()
                .map(|indicator| (index, indicator))
        })
        .unzip();

    let mut skipped = 0usize;
    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let date = table.cell(row, date_col).and_then(|raw| parse_market_date(raw).ok());
        let price = table.cell(row, price_col).and_then(parse_number);
        let (Some(date), Some(price)) = (date, price) else {
            skipped += 1;
            continue;
        };
        rows.push(MergedRow {
            date,
            indicators: columns
                .iter()
                .map(|column| table.cell(row, *column).and_then(parse_number))
                .collect(),
            price,
        });
    }

    if skipped > 0 {
        warn!(path = %path.display(), rows = skipped, "skipped merged rows without date or price");
    }
    Ok(MergedDataset { indicators, rows })
}

pub fn read_merged(path: &Path) -> Result<MergedDataset, TableError> {
    let table = CsvTable::read(path)?;
    let merged = parse_merged_table(&table, path)?;
    info!(path = %path.display(), rows = merged.len(), "merged data loaded");
    Ok(merged)
}

pub fn write_world_data(series: &IndicatorSeries, path: &Path) -> Result<(), TableError> {
    world_data_table(series).write(path)?;
    info!(path = %path.display(), rows = series.len(), "world data saved");
    Ok(())
}

pub fn write_merged(merged: &MergedDataset, path: &Path) -> Result<(), TableError> {
    merged_table(merged).write(path)?;
    info!(path = %path.display(), rows = merged.len(), "merged data saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Indicator, MergedRow};
    use chrono::NaiveDate;

    fn raw(rows: &[(&str, &str)]) -> CsvTable {
        let mut table = CsvTable::new(vec!["Date".into(), "Price".into()]);
        table.rows = rows
            .iter()
            .map(|(d, p)| vec![(*d).to_owned(), (*p).to_owned()])
            .collect();
        table
    }

    #[test]
    fn parse_counts_each_kind_of_dropped_row() {
        let table = raw(&[
            ("21-May-87", "18.45"),
            ("bogus", "1.0"),
            ("20-May-87", "18.63"),
            ("22-May-87", "n/a"),
            ("20-May-87", "99.0"),
        ]);
        let parsed = parse_price_table(&table, Path::new("prices.csv")).expect("columns exist");
        assert_eq!(parsed.invalid_dates, 1);
        assert_eq!(parsed.invalid_prices, 1);
        assert_eq!(parsed.duplicates_dropped, 1);
        assert_eq!(parsed.rows_dropped(), 3);
        assert_eq!(parsed.series.prices(), vec![18.63, 18.45]);
    }

    #[test]
    fn parse_requires_price_column() {
        let table = CsvTable::new(vec!["Date".into()]);
        let err = parse_price_table(&table, Path::new("p.csv")).expect_err("must fail");
        assert!(matches!(err, TableError::MissingColumn { column, .. } if column == "Price"));
    }

    #[test]
    fn merged_table_writes_empty_cells_for_missing_indicators() {
        let merged = MergedDataset {
            indicators: vec![Indicator::new("A", "GDP").expect("valid")],
            rows: vec![MergedRow {
                date: NaiveDate::from_ymd_opt(1987, 5, 20).expect("date"),
                indicators: vec![None],
                price: 18.63,
            }],
        };
        let table = merged_table(&merged);
        assert_eq!(table.headers, vec!["Date", "GDP", "Price"]);
        assert_eq!(table.rows[0], vec!["1987-05-20", "", "18.63"]);
    }

    #[test]
    fn merged_table_parses_back_into_a_dataset() {
        let mut table = CsvTable::new(vec!["Date".into(), "GDP".into(), "Price".into()]);
        table.rows = vec![
            vec!["1987-05-20".into(), "".into(), "18.63".into()],
            vec!["1987-05-21".into(), "2.5".into(), "18.45".into()],
            vec!["never".into(), "1.0".into(), "1.0".into()],
        ];
        let merged = parse_merged_table(&table, Path::new("m.csv")).expect("columns exist");
        assert_eq!(merged.value_columns(), vec!["GDP", "Price"]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rows[0].indicators, vec![None]);
        assert_eq!(merged.column("GDP").expect("known"), vec![None, Some(2.5)]);
    }
}
