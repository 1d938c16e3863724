//! World indicators → `world_data.csv` → daily → merged onto prices → `merged_data.csv`.

use std::sync::Arc;

use brentscope_core::config::DataConfig;
use brentscope_core::datasets::{read_prices, write_merged, write_world_data};
use brentscope_core::{
    format_iso, merge_counting_unmatched, resample_daily, BrentscopeConfig, DataExtractor, Indicator,
    WorldBankSource,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

use super::{step_error, CommandResult};
use crate::cli::FetchArgs;
use crate::error::CliError;

pub async fn run(args: &FetchArgs, config: &BrentscopeConfig) -> Result<CommandResult, CliError> {
    let extraction = &config.extraction;
    let source = WorldBankSource::default()
        .with_base_url(extraction.base_url.clone())
        .with_timeout_ms(extraction.timeout_ms)
        .with_per_page(extraction.per_page)
        .with_retry(extraction.retry());
    let country = args
        .country
        .clone()
        .unwrap_or_else(|| extraction.country.clone());
    let extractor = DataExtractor::new(Arc::new(source), country);

    pipeline(
        &extractor,
        &extraction.indicators,
        args.start.unwrap_or(extraction.start_date),
        args.end.unwrap_or(extraction.end_date),
        &config.data,
    )
    .await
}

/// A fetch failure stops the command; export failures are recorded and the
/// remaining steps still run.
pub(crate) async fn pipeline(
    extractor: &DataExtractor,
    indicators: &[Indicator],
    start: NaiveDate,
    end: NaiveDate,
    data: &DataConfig,
) -> Result<CommandResult, CliError> {
    let mut report = json!({
        "country": extractor.country(),
        "start": format_iso(start),
        "end": format_iso(end),
        "indicators": indicators.iter().map(|ind| ind.name.as_str()).collect::<Vec<_>>(),
    });
    let mut result = CommandResult::default();

    let world = match extractor.fetch(indicators, start, end).await {
        Ok(world) => world,
        Err(err) => {
            let retryable = err.retryable();
            result.push_error(step_error("fetch_failed", "fetch", &err)?.with_retryable(retryable));
            result.data = report;
            return Ok(result);
        }
    };

    let world_path = data.world_data_path();
    match write_world_data(&world, &world_path) {
        Ok(()) => report["world_data"] = file_entry(&world_path, world.len()),
        Err(err) => result.push_error(step_error("export_failed", "export_world_data", err)?),
    }

    let daily = resample_daily(&world);
    report["daily_rows"] = json!(daily.len());

    let prices = match read_prices(&data.prices_path()) {
        Ok(prices) => prices,
        Err(err) => {
            result.push_error(step_error("load_failed", "load_prices", err)?);
            result.data = report;
            return Ok(result);
        }
    };
    if prices.rows_dropped() > 0 {
        result.warnings.push(format!(
            "dropped {} price rows (invalid dates {}, invalid prices {}, duplicates {})",
            prices.rows_dropped(),
            prices.invalid_dates,
            prices.invalid_prices,
            prices.duplicates_dropped
        ));
    }

    let (merged, unmatched) = merge_counting_unmatched(&daily, &prices.series);
    report["unmatched_price_dates"] = json!(unmatched);

    let merged_path = data.merged_path();
    match write_merged(&merged, &merged_path) {
        Ok(()) => report["merged"] = file_entry(&merged_path, merged.len()),
        Err(err) => result.push_error(step_error("export_failed", "export_merged", err)?),
    }

    result.data = report;
    Ok(result)
}

fn file_entry(path: &std::path::Path, rows: usize) -> Value {
    json!({ "path": path.display().to_string(), "rows": rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::data_config;
    use brentscope_core::datasets::read_merged;
    use brentscope_core::http_client::{HttpError, HttpResponse, StaticHttpClient};
    use std::fs;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn indicators() -> Vec<Indicator> {
        vec![
            Indicator::new("GDP", "GDP Growth (%)").expect("valid"),
            Indicator::new("CPI", "Inflation Rate (%)").expect("valid"),
        ]
    }

    fn extractor(client: StaticHttpClient) -> DataExtractor {
        let source = WorldBankSource::with_http_client(Arc::new(client))
            .with_base_url("https://wb.test/v2")
            .with_retry(brentscope_core::retry::RetryConfig::no_retry());
        DataExtractor::new(Arc::new(source), "WLD")
    }

    fn upstream() -> StaticHttpClient {
        StaticHttpClient::new()
            .respond(
                "indicator/GDP",
                HttpResponse::ok_json(r#"[{"pages":1},[{"date":"2001","value":2.0},{"date":"2000","value":1.0}]]"#),
            )
            .respond(
                "indicator/CPI",
                HttpResponse::ok_json(r#"[{"pages":1},[{"date":"2000","value":5.0}]]"#),
            )
    }

    #[tokio::test]
    async fn writes_world_and_merged_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("BrentOilprices.csv"),
            "Date,Price\n01-Jun-00,30.5\n2001-03-01,25.0\nbad,1\n",
        )
        .expect("prices");
        let data = data_config(dir.path());

        let result = pipeline(&extractor(upstream()), &indicators(), ymd(2000, 1, 1), ymd(2001, 12, 31), &data)
            .await
            .expect("pipeline runs");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.data["world_data"]["rows"], 2);
        assert_eq!(result.data["daily_rows"], 367);
        assert_eq!(result.data["merged"]["rows"], 2);
        assert_eq!(result.data["unmatched_price_dates"], 1);

        let merged = read_merged(&data.merged_path()).expect("merged file");
        assert_eq!(merged.value_columns(), vec!["GDP Growth (%)", "Inflation Rate (%)", "Price"]);
        assert_eq!(merged.rows[0].indicators, vec![Some(1.0), Some(5.0)]);
        assert_eq!(merged.rows[1].indicators, vec![None, None]);
    }

    #[tokio::test]
    async fn fetch_failure_stops_before_writing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let client = StaticHttpClient::new().fail("indicator/", HttpError::non_retryable("connection refused"));
        let data = data_config(dir.path());

        let result = pipeline(&extractor(client), &indicators(), ymd(2000, 1, 1), ymd(2001, 12, 31), &data)
            .await
            .expect("pipeline runs");

        assert_eq!(result.error_codes(), vec!["fetch_failed"]);
        assert_eq!(result.errors[0].step.as_deref(), Some("fetch"));
        assert!(result.data.get("world_data").is_none());
        assert!(!data.world_data_path().exists());
    }

    #[tokio::test]
    async fn missing_prices_keeps_the_world_data() {
        let dir = tempfile::tempdir().expect("temp dir");
        let data = data_config(dir.path());

        let result = pipeline(&extractor(upstream()), &indicators(), ymd(2000, 1, 1), ymd(2001, 12, 31), &data)
            .await
            .expect("pipeline runs");

        assert_eq!(result.error_codes(), vec!["load_failed"]);
        assert!(data.world_data_path().exists());
        assert!(!data.merged_path().exists());
    }
}
