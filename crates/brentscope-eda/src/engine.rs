//! Stateful EDA pipeline over a Brent price CSV.

use std::path::{Path, PathBuf};

use brentscope_core::config::EdaConfig;
use brentscope_core::datasets::parse_price_table;
use brentscope_core::{CsvTable, PriceSeries};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::changepoint::{detect_change_points, PeltConfig};
use crate::correlogram::{correlogram, Correlogram};
use crate::decomposition::{seasonal_decompose, Decomposition};
use crate::describe::{describe, Summary};
use crate::histogram::{histogram, Histogram};
use crate::stationarity::{check_stationarity, Stationarity};
use crate::{charts, cusum, EdaError};

/// Analysis parameters, normally taken from [`EdaConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdaSettings {
    pub decomposition_period: usize,
    pub acf_lags: usize,
    pub histogram_bins: usize,
    pub change_points: PeltConfig,
    pub adf_significance: f64,
}

impl Default for EdaSettings {
    fn default() -> Self {
        Self::from(&EdaConfig::default())
    }
}

impl From<&EdaConfig> for EdaSettings {
    fn from(config: &EdaConfig) -> Self {
        Self {
            decomposition_period: config.decomposition_period,
            acf_lags: config.acf_lags,
            histogram_bins: config.histogram_bins,
            change_points: PeltConfig {
                penalty: config.change_point_penalty,
                min_size: config.change_point_min_size,
                jump: config.change_point_jump,
                gamma: None,
            },
            adf_significance: config.adf_significance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EdaState {
    Unloaded,
    Loaded(CsvTable),
    Formatted(PriceSeries),
}

/// Change points with the date closing each segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePointReport {
    pub breakpoints: Vec<usize>,
    /// `dates[bp - 1]` for every breakpoint, so the last is the final date.
    pub dates: Vec<NaiveDate>,
    pub gamma: f64,
    pub penalty: f64,
}

/// Moves through `Unloaded -> Loaded -> Formatted`; analyses need the
/// formatted state.
#[derive(Debug)]
pub struct BrentEda {
    path: PathBuf,
    settings: EdaSettings,
    charts_dir: Option<PathBuf>,
    state: EdaState,
    price_diff: Option<Vec<Option<f64>>>,
}

impl BrentEda {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: EdaSettings::default(),
            charts_dir: None,
            state: EdaState::Unloaded,
            price_diff: None,
        }
    }

    pub fn with_settings(mut self, settings: EdaSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Render SVG charts into `dir` as analyses run.
    pub fn with_charts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.charts_dir = Some(dir.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &EdaSettings {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self.state, EdaState::Unloaded)
    }

    pub fn is_formatted(&self) -> bool {
        matches!(self.state, EdaState::Formatted(_))
    }

    /// Read the CSV as raw text. Returns the number of data rows.
    pub fn load(&mut self) -> Result<usize, EdaError> {
        let table = CsvTable::read(&self.path)?;
        let rows = table.len();
        info!(path = %self.path.display(), rows, "price data loaded");
        self.state = EdaState::Loaded(table);
        self.price_diff = None;
        Ok(rows)
    }

    /// Parse dates and prices, dropping bad rows and duplicate dates.
    /// A second call leaves the series untouched.
    pub fn format_date(&mut self) -> Result<&PriceSeries, EdaError> {
        if let EdaState::Loaded(table) = &self.state {
            let parsed = parse_price_table(table, &self.path)?;
            if parsed.invalid_dates + parsed.invalid_prices > 0 {
                warn!(
                    invalid_dates = parsed.invalid_dates,
                    invalid_prices = parsed.invalid_prices,
                    "dropped unparseable rows"
                );
            }
            if parsed.duplicates_dropped > 0 {
                warn!(rows = parsed.duplicates_dropped, "dropped duplicate dates");
            }
            info!(rows = parsed.series.len(), "dates formatted");
            self.state = EdaState::Formatted(parsed.series);
        }
        self.series()
    }

    pub fn series(&self) -> Result<&PriceSeries, EdaError> {
        match &self.state {
            EdaState::Unloaded => Err(EdaError::NotLoaded),
            EdaState::Loaded(_) => Err(EdaError::NotFormatted),
            EdaState::Formatted(series) => Ok(series),
        }
    }

    /// First differences added by [`Self::check_stationarity`], if any.
    pub fn price_diff(&self) -> Option<&[Option<f64>]> {
        self.price_diff.as_deref()
    }

    fn chart_path(&self, name: &str) -> Option<PathBuf> {
        self.charts_dir.as_ref().map(|dir| dir.join(format!("{name}.svg")))
    }

    pub fn describe(&self) -> Result<Summary, EdaError> {
        describe(&self.series()?.prices())
    }

    /// Returns the chart path, `None` when charts are disabled.
    pub fn plot_time_series(&self) -> Result<Option<PathBuf>, EdaError> {
        let series = self.series()?;
        if series.is_empty() {
            return Err(EdaError::insufficient("time series plot", 1, 0));
        }
        let Some(path) = self.chart_path("time_series") else {
            return Ok(None);
        };
        charts::time_series(&path, &series.dates(), &series.prices())?;
        Ok(Some(path))
    }

    pub fn seasonal_decomposition(&self) -> Result<Decomposition, EdaError> {
        let series = self.series()?;
        let parts = seasonal_decompose(&series.prices(), self.settings.decomposition_period)?;
        if let Some(path) = self.chart_path("seasonal_decomposition") {
            charts::decomposition(&path, &series.dates(), &parts)?;
        }
        Ok(parts)
    }

    pub fn acf_pacf(&self) -> Result<Correlogram, EdaError> {
        let gram = correlogram(&self.series()?.prices(), self.settings.acf_lags)?;
        if let Some(path) = self.chart_path("acf_pacf") {
            charts::correlogram(&path, &gram)?;
        }
        Ok(gram)
    }

    pub fn histogram(&self) -> Result<Histogram, EdaError> {
        let hist = histogram(&self.series()?.prices(), self.settings.histogram_bins)?;
        if let Some(path) = self.chart_path("histogram") {
            charts::histogram(&path, &hist)?;
        }
        Ok(hist)
    }

    pub fn cusum(&self) -> Result<Vec<f64>, EdaError> {
        let series = self.series()?;
        let sums = cusum::cusum(&series.prices())?;
        if let Some(path) = self.chart_path("cusum") {
            charts::cusum(&path, &series.dates(), &sums)?;
        }
        Ok(sums)
    }

    pub fn change_point_analysis(&self) -> Result<ChangePointReport, EdaError> {
        let series = self.series()?;
        let prices = series.prices();
        let dates = series.dates();
        let found = detect_change_points(&prices, &self.settings.change_points)?;

        let boundary_dates: Vec<NaiveDate> = found
            .breakpoints
            .iter()
            .filter_map(|bp| bp.checked_sub(1).and_then(|i| dates.get(i).copied()))
            .collect();
        info!(
            change_points = found.interior().len(),
            penalty = found.penalty,
            "change point analysis complete"
        );

        if let Some(path) = self.chart_path("change_points") {
            let interior = &boundary_dates[..boundary_dates.len().saturating_sub(1)];
            charts::change_points(&path, &dates, &prices, interior)?;
        }

        Ok(ChangePointReport {
            breakpoints: found.breakpoints,
            dates: boundary_dates,
            gamma: found.gamma,
            penalty: found.penalty,
        })
    }

    /// ADF test; a non-stationary series gets a `price_diff` column.
    pub fn check_stationarity(&mut self) -> Result<Stationarity, EdaError> {
        let series = self.series()?;
        let outcome = check_stationarity(&series.prices(), self.settings.adf_significance)?;
        let adf = outcome.adf();
        info!(
            statistic = adf.statistic,
            p_value = adf.p_value,
            used_lag = adf.used_lag,
            "adf test complete"
        );

        match &outcome {
            Stationarity::Stationary { .. } => {
                info!("series is stationary");
                self.price_diff = None;
            }
            Stationarity::Differenced { price_diff, .. } => {
                info!("series is non-stationary, first differences added");
                if let Some(path) = self.chart_path("price_diff") {
                    charts::differenced(&path, &series.dates(), price_diff)?;
                }
                self.price_diff = Some(price_diff.clone());
            }
        }
        Ok(outcome)
    }

    /// Run every analysis; a failure is logged and recorded without
    /// stopping the rest.
    pub fn run_all(&mut self) -> EdaReport {
        let report = EdaReport {
            summary: logged("describe", self.describe()),
            time_series_chart: logged("plot_time_series", self.plot_time_series()),
            decomposition: logged("seasonal_decomposition", self.seasonal_decomposition()),
            correlogram: logged("acf_pacf", self.acf_pacf()),
            histogram: logged("histogram", self.histogram()),
            cusum: logged("cusum", self.cusum()),
            change_points: logged("change_point_analysis", self.change_point_analysis()),
            stationarity: logged("check_stationarity", self.check_stationarity()),
        };
        info!(failed = report.failures().len(), "eda battery finished");
        report
    }
}

fn logged<T>(analysis: &'static str, result: Result<T, EdaError>) -> Result<T, EdaError> {
    if let Err(err) = &result {
        warn!(analysis, code = err.code(), error = %err, "analysis failed");
    }
    result
}

/// Per-analysis outcomes of [`BrentEda::run_all`].
#[derive(Debug)]
pub struct EdaReport {
    pub summary: Result<Summary, EdaError>,
    pub time_series_chart: Result<Option<PathBuf>, EdaError>,
    pub decomposition: Result<Decomposition, EdaError>,
    pub correlogram: Result<Correlogram, EdaError>,
    pub histogram: Result<Histogram, EdaError>,
    pub cusum: Result<Vec<f64>, EdaError>,
    pub change_points: Result<ChangePointReport, EdaError>,
    pub stationarity: Result<Stationarity, EdaError>,
}

impl EdaReport {
    pub fn failures(&self) -> Vec<(&'static str, &EdaError)> {
        let outcomes: [(&'static str, Option<&EdaError>); 8] = [
            ("describe", self.summary.as_ref().err()),
            ("plot_time_series", self.time_series_chart.as_ref().err()),
            ("seasonal_decomposition", self.decomposition.as_ref().err()),
            ("acf_pacf", self.correlogram.as_ref().err()),
            ("histogram", self.histogram.as_ref().err()),
            ("cusum", self.cusum.as_ref().err()),
            ("change_point_analysis", self.change_points.as_ref().err()),
            ("check_stationarity", self.stationarity.as_ref().err()),
        ];
        outcomes
            .into_iter()
            .filter_map(|(name, err)| err.map(|err| (name, err)))
            .collect()
    }
}
