//! # Brentscope Model
//!
//! Forecasting for the Brent price series: chronological train/test split,
//! ARIMA estimation and forecasting, and R² / RMSE scoring.
//!
//! ```no_run
//! use brentscope_model::ModelBuilder;
//!
//! let prices: Vec<f64> = (0..500).map(|t| 60.0 + (t as f64 * 0.01).sin()).collect();
//! let artifact = ModelBuilder::default().evaluate(&prices)?;
//! println!("R² = {:.3}", artifact.r2);
//! # Ok::<(), brentscope_model::ModelError>(())
//! ```

pub mod arima;
pub mod error;
pub mod metrics;
pub mod split;
pub mod strategy;

pub use arima::{ArimaModel, ArimaOrder};
pub use error::ModelError;
pub use metrics::{r2_score, rmse};
pub use split::split;
pub use strategy::{fit_arima, FittedModel, ModelArtifact, ModelBuilder, ModelStrategy};
