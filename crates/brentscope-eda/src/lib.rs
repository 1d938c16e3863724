//! # Brentscope EDA
//!
//! Exploratory analysis of the Brent price series: summary statistics,
//! additive decomposition, correlograms, distribution, CUSUM, change-point
//! detection and the ADF stationarity test, with optional SVG charts.
//!
//! [`BrentEda`] drives the analyses over a price CSV:
//!
//! ```no_run
//! use brentscope_eda::BrentEda;
//!
//! let mut eda = BrentEda::new("data/BrentOilprices.csv").with_charts_dir("charts");
//! eda.load()?;
//! eda.format_date()?;
//! let report = eda.run_all();
//! for (analysis, err) in report.failures() {
//!     eprintln!("{analysis}: {err}");
//! }
//! # Ok::<(), brentscope_eda::EdaError>(())
//! ```
//!
//! The analysis functions are also usable directly on `&[f64]`.

pub mod changepoint;
pub mod charts;
pub mod correlogram;
pub mod cusum;
pub mod decomposition;
pub mod describe;
pub mod engine;
pub mod error;
pub mod histogram;
pub mod stationarity;

pub use changepoint::{detect_change_points, ChangePoints, PeltConfig};
pub use correlogram::Correlogram;
pub use decomposition::Decomposition;
pub use describe::Summary;
pub use engine::{BrentEda, ChangePointReport, EdaReport, EdaSettings};
pub use error::EdaError;
pub use histogram::{Histogram, Kde};
pub use stationarity::{adf_test, AdfResult, CriticalValues, Stationarity};
