use brentscope_core::datasets::read_merged;
use brentscope_core::{correlation_matrix, specific_correlation, BrentscopeConfig};
use brentscope_eda::charts;
use serde_json::json;

use super::{step_error, CommandResult};
use crate::cli::CorrelateArgs;
use crate::error::CliError;

const HEATMAP_FILE: &str = "correlation_heatmap.svg";

pub fn run(args: &CorrelateArgs, config: &BrentscopeConfig) -> Result<CommandResult, CliError> {
    let path = config.data.merged_path();
    let mut result = CommandResult::ok(json!({ "path": path.display().to_string() }));

    let merged = match read_merged(&path) {
        Ok(merged) => merged,
        Err(err) => {
            result.push_error(step_error("load_failed", "load_merged", err)?);
            return Ok(result);
        }
    };
    result.data["rows"] = json!(merged.len());

    if let Some([first, second]) = args.pair.as_deref() {
        match specific_correlation(&merged, first, second) {
            Ok(correlation) => {
                if correlation.is_none() {
                    result
                        .warnings
                        .push(format!("'{first}' and '{second}' have fewer than two complete varying pairs"));
                }
                result.data["pair"] = json!({
                    "first": first,
                    "second": second,
                    "correlation": correlation,
                });
            }
            Err(err) => result.push_error(step_error("correlation_failed", "specific_correlation", err)?),
        }
        return Ok(result);
    }

    let matrix = match correlation_matrix(&merged) {
        Ok(matrix) => matrix,
        Err(err) => {
            result.push_error(step_error("correlation_failed", "correlation_matrix", err)?);
            return Ok(result);
        }
    };

    if let Some(dir) = &args.charts_dir {
        let chart = dir.join(HEATMAP_FILE);
        match charts::correlation_heatmap(&chart, &matrix) {
            Ok(()) => result.data["heatmap"] = json!(chart.display().to_string()),
            Err(err) => result.push_error(step_error("chart_failed", "correlation_heatmap", err)?),
        }
    }
    result.data["matrix"] = json!(matrix);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::data_config;
    use std::fs;

    fn config_with_merged(dir: &std::path::Path) -> BrentscopeConfig {
        fs::write(
            dir.join("merged_data.csv"),
            "Date,GDP Growth (%),Inflation Rate (%),Price\n\
             2020-01-01,1.0,3.0,50\n\
             2020-01-02,2.0,3.0,52\n\
             2020-01-03,3.0,3.0,54\n\
             2020-01-04,,3.0,56\n",
        )
        .expect("merged");
        BrentscopeConfig {
            data: data_config(dir),
            ..BrentscopeConfig::default()
        }
    }

    #[test]
    fn matrix_and_heatmap() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config_with_merged(dir.path());
        let args = CorrelateArgs {
            pair: None,
            charts_dir: Some(dir.path().join("charts")),
        };

        let result = run(&args, &config).expect("runs");
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.data["rows"], 4);
        let matrix = &result.data["matrix"];
        assert_eq!(matrix["columns"][2], "Price");
        let gdp_price = matrix["values"][0][2].as_f64().expect("defined");
        assert!((gdp_price - 1.0).abs() < 1e-9);
        assert!(matrix["values"][1][2].is_null());
        assert!(dir.path().join("charts").join(HEATMAP_FILE).exists());
    }

    #[test]
    fn constant_pair_warns() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config_with_merged(dir.path());
        let args = CorrelateArgs {
            pair: Some(vec!["Inflation Rate (%)".into(), "Price".into()]),
            charts_dir: None,
        };

        let result = run(&args, &config).expect("runs");
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.data["pair"]["correlation"].is_null());
    }

    #[test]
    fn unknown_column_is_a_step_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config_with_merged(dir.path());
        let args = CorrelateArgs {
            pair: Some(vec!["Oil Rents".into(), "Price".into()]),
            charts_dir: None,
        };

        let result = run(&args, &config).expect("runs");
        assert_eq!(result.error_codes(), vec!["correlation_failed"]);
    }

    #[test]
    fn missing_merged_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = BrentscopeConfig {
            data: data_config(dir.path()),
            ..BrentscopeConfig::default()
        };
        let args = CorrelateArgs {
            pair: None,
            charts_dir: None,
        };
        let result = run(&args, &config).expect("runs");
        assert_eq!(result.error_codes(), vec!["load_failed"]);
    }
}
