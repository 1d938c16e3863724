//! Forecasting strategies and the artifact they produce.

use brentscope_core::config::ModelConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::arima::{ArimaModel, ArimaOrder};
use crate::metrics::{r2_score, rmse};
use crate::split::split;
use crate::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelStrategy {
    Arima(ArimaOrder),
    /// Recurrent network forecaster; not available in this build.
    Lstm,
}

impl Default for ModelStrategy {
    fn default() -> Self {
        Self::Arima(ArimaOrder::default())
    }
}

impl ModelStrategy {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Arima(_) => "arima",
            Self::Lstm => "lstm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    Arima(ArimaModel),
}

/// Fitted model, its test-horizon forecast and the scores against it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelArtifact {
    pub model: FittedModel,
    pub forecast: Vec<f64>,
    pub r2: f64,
    pub rmse: f64,
    pub train_len: usize,
    pub test_len: usize,
}

/// Fit ARIMA on `train`, forecast `test.len()` steps and score the forecast.
pub fn fit_arima(
    train: &[f64],
    test: &[f64],
    order: ArimaOrder,
    include_constant: bool,
) -> Result<ModelArtifact, ModelError> {
    let model = ArimaModel::fit(train, order, include_constant)?;
    let forecast = model.forecast(test.len());
    let r2 = r2_score(test, &forecast)?;
    let rmse = rmse(test, &forecast)?;
    info!(order = %order, r2, rmse, horizon = test.len(), "arima evaluated");

    Ok(ModelArtifact {
        model: FittedModel::Arima(model),
        forecast,
        r2,
        rmse,
        train_len: train.len(),
        test_len: test.len(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelBuilder {
    pub strategy: ModelStrategy,
    pub train_fraction: f64,
    pub include_constant: bool,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for ModelBuilder {
    fn from(config: &ModelConfig) -> Self {
        Self {
            strategy: ModelStrategy::Arima(config.arima_order.into()),
            train_fraction: config.train_fraction,
            include_constant: config.include_constant,
        }
    }
}

impl ModelBuilder {
    pub fn with_strategy(mut self, strategy: ModelStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn split<'a>(&self, data: &'a [f64]) -> Result<(&'a [f64], &'a [f64]), ModelError> {
        split(data, self.train_fraction)
    }

    pub fn fit(&self, train: &[f64], test: &[f64]) -> Result<ModelArtifact, ModelError> {
        match self.strategy {
            ModelStrategy::Arima(order) => fit_arima(train, test, order, self.include_constant),
            ModelStrategy::Lstm => Err(ModelError::Unimplemented("LSTM")),
        }
    }

    /// Split chronologically, then fit and score.
    pub fn evaluate(&self, data: &[f64]) -> Result<ModelArtifact, ModelError> {
        let (train, test) = self.split(data)?;
        self.fit(train, test)
    }
}
