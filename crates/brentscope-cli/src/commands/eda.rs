use brentscope_core::BrentscopeConfig;
use brentscope_eda::{BrentEda, Decomposition, EdaSettings, Histogram, Stationarity};
use serde_json::{json, Value};

use super::{step_error, CommandResult};
use crate::cli::EdaArgs;
use crate::error::CliError;

pub fn run(args: &EdaArgs, config: &BrentscopeConfig) -> Result<CommandResult, CliError> {
    let mut eda = BrentEda::new(config.data.prices_path()).with_settings(EdaSettings::from(&config.eda));
    if let Some(dir) = &args.charts_dir {
        eda = eda.with_charts_dir(dir);
    }
    analyse(eda)
}

fn analyse(mut eda: BrentEda) -> Result<CommandResult, CliError> {
    let path = eda.path().display().to_string();
    let mut result = CommandResult::ok(json!({ "path": path }));

    let raw_rows = match eda.load() {
        Ok(rows) => rows,
        Err(err) => {
            result.push_error(step_error("load_failed", "load", err)?);
            return Ok(result);
        }
    };
    let rows = match eda.format_date() {
        Ok(series) => series.len(),
        Err(err) => {
            result.push_error(step_error("format_failed", "format_date", err)?);
            return Ok(result);
        }
    };
    if raw_rows > rows {
        result
            .warnings
            .push(format!("dropped {} of {raw_rows} price rows", raw_rows - rows));
    }

    let report = eda.run_all();
    for (analysis, err) in report.failures() {
        result.push_error(step_error(failure_code(analysis), analysis, err)?);
    }

    result.data = json!({
        "path": path,
        "rows": rows,
        "summary": report.summary.as_ref().ok(),
        "time_series_chart": report
            .time_series_chart
            .as_ref()
            .ok()
            .and_then(Option::as_ref)
            .map(|chart| chart.display().to_string()),
        "decomposition": report.decomposition.as_ref().ok().map(decomposition_digest),
        "correlogram": report.correlogram.as_ref().ok(),
        "histogram": report.histogram.as_ref().ok().map(histogram_digest),
        "cusum": report.cusum.as_ref().ok().map(|cusum| cusum_digest(cusum)),
        "change_points": report.change_points.as_ref().ok(),
        "stationarity": report.stationarity.as_ref().ok().map(stationarity_digest),
    });
    Ok(result)
}

fn failure_code(analysis: &str) -> &'static str {
    match analysis {
        "describe" => "describe_failed",
        "plot_time_series" => "chart_failed",
        "seasonal_decomposition" => "decomposition_failed",
        "acf_pacf" => "correlogram_failed",
        "histogram" => "histogram_failed",
        "cusum" => "cusum_failed",
        "change_point_analysis" => "change_point_failed",
        "check_stationarity" => "stationarity_failed",
        _ => "analysis_failed",
    }
}

// Full component vectors stay in the charts; the envelope gets one seasonal cycle.
fn decomposition_digest(decomposition: &Decomposition) -> Value {
    let cycle = decomposition.period.min(decomposition.seasonal.len());
    json!({
        "period": decomposition.period,
        "seasonal_cycle": &decomposition.seasonal[..cycle],
        "trend_last": decomposition.trend.iter().rev().find_map(|value| *value),
    })
}

fn histogram_digest(histogram: &Histogram) -> Value {
    json!({
        "edges": histogram.edges,
        "counts": histogram.counts,
        "mean": histogram.mean,
        "median": histogram.median,
        "min": histogram.min,
        "max": histogram.max,
        "kde_bandwidth": histogram.kde.as_ref().map(|kde| kde.bandwidth),
    })
}

fn cusum_digest(cusum: &[f64]) -> Value {
    let min = cusum.iter().copied().fold(f64::INFINITY, f64::min);
    let max = cusum.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    json!({
        "len": cusum.len(),
        "min": min,
        "max": max,
        "last": cusum.last(),
    })
}

fn stationarity_digest(stationarity: &Stationarity) -> Value {
    let (outcome, differenced_len) = match stationarity {
        Stationarity::Stationary { .. } => ("stationary", None),
        Stationarity::Differenced { price_diff, .. } => ("differenced", Some(price_diff.len())),
    };
    json!({
        "outcome": outcome,
        "adf": stationarity.adf(),
        "differenced_len": differenced_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{data_config, write_prices};
    use std::fs;

    fn config(dir: &std::path::Path) -> BrentscopeConfig {
        BrentscopeConfig {
            data: data_config(dir),
            ..BrentscopeConfig::default()
        }
    }

    #[test]
    fn missing_price_file_is_a_load_failure() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = run(&EdaArgs { charts_dir: None }, &config(dir.path())).expect("runs");
        assert_eq!(result.error_codes(), vec!["load_failed"]);
        assert!(result.data.get("summary").is_none());
    }

    #[test]
    fn short_series_reports_failed_analyses_and_keeps_the_rest() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("BrentOilprices.csv"),
            "Date,Price\n2020-01-01,50\n2020-01-02,51\n2020-01-03,49\nnot-a-date,1\n",
        )
        .expect("prices");

        let result = run(&EdaArgs { charts_dir: None }, &config(dir.path())).expect("runs");
        let codes = result.error_codes();
        assert!(codes.contains(&"decomposition_failed"), "{codes:?}");
        assert!(codes.contains(&"stationarity_failed"), "{codes:?}");
        assert_eq!(result.warnings, vec!["dropped 1 of 4 price rows"]);
        assert_eq!(result.data["rows"], 3);
        assert_eq!(result.data["summary"]["count"], 3);
        assert_eq!(result.data["cusum"]["len"], 3);
        assert!(result.data["decomposition"].is_null());
    }

    #[test]
    fn long_series_runs_clean_and_writes_charts() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_prices(dir.path(), 300);
        let charts = dir.path().join("charts");

        let args = EdaArgs {
            charts_dir: Some(charts.clone()),
        };
        let result = run(&args, &config(dir.path())).expect("runs");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.data["decomposition"]["period"], 30);
        assert_eq!(
            result.data["decomposition"]["seasonal_cycle"]
                .as_array()
                .map(Vec::len),
            Some(30)
        );
        assert!(result.data["change_points"]["breakpoints"]
            .as_array()
            .is_some_and(|bps| !bps.is_empty()));
        assert!(charts.join("change_points.svg").exists());
        assert!(charts.join("histogram.svg").exists());
    }
}
