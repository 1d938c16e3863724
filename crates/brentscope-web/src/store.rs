//! Datasets served by the API, rendered to JSON once per load.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use brentscope_core::config::DataConfig;
use brentscope_core::CsvTable;
use serde_json::Value;
use tracing::{error, info};

use crate::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dataset {
    MergedHistory,
    HistoricalPrices,
    Events,
    Forecast,
}

impl Dataset {
    pub const ALL: [Dataset; 4] = [
        Dataset::MergedHistory,
        Dataset::HistoricalPrices,
        Dataset::Events,
        Dataset::Forecast,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::MergedHistory => "merged_oil_price_history",
            Self::HistoricalPrices => "historical-prices",
            Self::Events => "events",
            Self::Forecast => "forecast",
        }
    }

    pub fn route(self) -> String {
        format!("/api/data/{}", self.name())
    }

    pub fn path(self, data: &DataConfig) -> PathBuf {
        match self {
            Self::MergedHistory => data.merged_path(),
            Self::HistoricalPrices => data.prices_path(),
            Self::Events => data.world_data_path(),
            Self::Forecast => data.forecast_path(),
        }
    }
}

/// Serialized record arrays, or the reason a file could not be read.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    entries: Vec<(Dataset, Result<Bytes, String>)>,
}

fn render(path: &Path) -> Result<Bytes, String> {
    let table = CsvTable::read(path).map_err(|err| err.to_string())?;
    let records = Value::Array(table.to_records());
    serde_json::to_vec(&records)
        .map(Bytes::from)
        .map_err(|err| err.to_string())
}

impl DatasetStore {
    /// Read every dataset; an unreadable file only affects its own endpoint.
    pub fn load(data: &DataConfig) -> Self {
        let entries = Dataset::ALL
            .iter()
            .map(|dataset| {
                let path = dataset.path(data);
                let rendered = render(&path);
                match &rendered {
                    Ok(bytes) => info!(
                        dataset = dataset.name(),
                        path = %path.display(),
                        bytes = bytes.len(),
                        "dataset loaded"
                    ),
                    Err(reason) => error!(
                        dataset = dataset.name(),
                        path = %path.display(),
                        %reason,
                        "dataset unavailable"
                    ),
                }
                (*dataset, rendered)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, dataset: Dataset) -> Result<Bytes, ApiError> {
        let unavailable = |reason: &str| ApiError::DatasetUnavailable {
            dataset: dataset.name(),
            reason: reason.to_owned(),
        };
        match self.entries.iter().find(|(key, _)| *key == dataset) {
            Some((_, Ok(bytes))) => Ok(bytes.clone()),
            Some((_, Err(reason))) => Err(unavailable(reason)),
            None => Err(unavailable("not loaded")),
        }
    }

    pub fn available(&self) -> usize {
        self.entries.iter().filter(|(_, entry)| entry.is_ok()).count()
    }
}
