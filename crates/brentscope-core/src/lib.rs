//! # Brentscope Core
//!
//! Domain types, datasets and macro-indicator extraction for studying Brent
//! crude prices against world economic indicators.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Indicator providers (World Bank v2) |
//! | [`config`] | Layered JSON/env configuration |
//! | [`data_source`] | Indicator source trait, requests and `ExtractionError` |
//! | [`datasets`] | CSV files ⇄ domain series |
//! | [`domain`] | Price, indicator and merged series |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`extraction`] | Fetch, daily resample, merge and correlation |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`retry`] | Backoff policy |
//! | [`table`] | Raw CSV tables and typed JSON records |
//!
//! ## Pipeline
//!
//! ```text
//! World Bank ──fetch──▶ IndicatorSeries ──resample_daily──▶ DailyIndicatorSeries
//!                                                               │
//! BrentOilprices.csv ──read_prices──▶ PriceSeries ──────merge───┤
//!                                                               ▼
//!                                              MergedDataset ──▶ merged_data.csv
//! ```

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod datasets;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod extraction;
pub mod http_client;
pub mod retry;
pub mod table;

pub use adapters::WorldBankSource;
pub use config::BrentscopeConfig;
pub use data_source::{
    DateWindow, ExtractionError, ExtractionErrorKind, IndicatorRequest, IndicatorSource,
    Observation,
};
pub use domain::*;
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, TableError, ValidationError};
pub use extraction::{
    correlation_matrix, merge, merge_counting_unmatched, resample_daily, specific_correlation,
    CorrelationMatrix, DataExtractor,
};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use table::CsvTable;
