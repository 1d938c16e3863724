use brentscope_core::datasets::read_prices;
use brentscope_core::BrentscopeConfig;
use brentscope_model::{ArimaOrder, ModelBuilder, ModelStrategy};
use serde_json::json;

use super::{step_error, CommandResult};
use crate::cli::{ModelArgs, StrategyArg};
use crate::error::CliError;

fn builder(args: &ModelArgs, config: &BrentscopeConfig) -> ModelBuilder {
    let mut builder = ModelBuilder::from(&config.model);
    builder.strategy = match args.strategy {
        StrategyArg::Arima => {
            ModelStrategy::Arima(args.order.map_or_else(|| config.model.arima_order.into(), ArimaOrder::from))
        }
        StrategyArg::Lstm => ModelStrategy::Lstm,
    };
    if let Some(fraction) = args.train_fraction {
        builder.train_fraction = fraction;
    }
    if args.no_constant {
        builder.include_constant = false;
    }
    builder
}

pub fn run(args: &ModelArgs, config: &BrentscopeConfig) -> Result<CommandResult, CliError> {
    let path = config.data.prices_path();
    let builder = builder(args, config);
    let mut result = CommandResult::ok(json!({
        "path": path.display().to_string(),
        "strategy": builder.strategy,
        "train_fraction": builder.train_fraction,
    }));

    let prices = match read_prices(&path) {
        Ok(parsed) => parsed.series.prices(),
        Err(err) => {
            result.push_error(step_error("load_failed", "load_prices", err)?);
            return Ok(result);
        }
    };

    match builder.evaluate(&prices) {
        Ok(artifact) => {
            result.data["train_len"] = json!(artifact.train_len);
            result.data["test_len"] = json!(artifact.test_len);
            result.data["r2"] = json!(artifact.r2);
            result.data["rmse"] = json!(artifact.rmse);
            result.data["model"] = json!(artifact.model);
            result.data["forecast_first"] = json!(artifact.forecast.first());
            result.data["forecast_last"] = json!(artifact.forecast.last());
        }
        Err(err) => {
            let code = err.code();
            result.push_error(step_error("model_failed", builder.strategy.name(), format!("{err} ({code})"))?);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{data_config, write_prices};

    fn config(dir: &std::path::Path) -> BrentscopeConfig {
        BrentscopeConfig {
            data: data_config(dir),
            ..BrentscopeConfig::default()
        }
    }

    fn args(strategy: StrategyArg) -> ModelArgs {
        ModelArgs {
            strategy,
            order: None,
            train_fraction: None,
            no_constant: false,
        }
    }

    #[test]
    fn flags_override_the_configured_model() {
        let config = BrentscopeConfig::default();
        let mut model_args = args(StrategyArg::Arima);
        model_args.order = Some((2, 1, 0));
        model_args.train_fraction = Some(0.9);
        model_args.no_constant = true;

        let built = builder(&model_args, &config);
        assert_eq!(built.strategy, ModelStrategy::Arima(ArimaOrder::from((2, 1, 0))));
        assert_eq!(built.train_fraction, 0.9);
        assert!(!built.include_constant);

        let default = builder(&args(StrategyArg::Arima), &config);
        assert_eq!(default.strategy, ModelStrategy::Arima(ArimaOrder::default()));
        assert!(default.include_constant);
    }

    #[test]
    fn arima_scores_the_holdout() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_prices(dir.path(), 200);

        let result = run(&args(StrategyArg::Arima), &config(dir.path())).expect("runs");
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.data["train_len"], 160);
        assert_eq!(result.data["test_len"], 40);
        assert!(result.data["rmse"].as_f64().is_some_and(|rmse| rmse >= 0.0));
        assert_eq!(result.data["strategy"]["kind"], "arima");
    }

    #[test]
    fn lstm_is_reported_as_unimplemented() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_prices(dir.path(), 50);

        let result = run(&args(StrategyArg::Lstm), &config(dir.path())).expect("runs");
        assert_eq!(result.error_codes(), vec!["model_failed"]);
        assert_eq!(result.errors[0].step.as_deref(), Some("lstm"));
        assert!(result.errors[0].message.contains("model.unimplemented"));
    }
}
