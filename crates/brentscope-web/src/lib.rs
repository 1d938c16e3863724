//! # Brentscope Web
//!
//! Read-only JSON API over the precomputed CSV datasets for the dashboard.
//!
//! | Method | Path | File |
//! |--------|------|------|
//! | GET | `/api/data/merged_oil_price_history` | `merged_data.csv` |
//! | GET | `/api/data/historical-prices` | `BrentOilprices.csv` |
//! | GET | `/api/data/events` | `world_data.csv` |
//! | GET | `/api/data/forecast` | forecast file (`world_data.csv` by default) |
//! | GET | `/health` | liveness |
//!
//! Each dataset endpoint returns the whole file as an array of row objects
//! in column order. Files are read at start-up and, when `refresh_secs` is
//! set, re-read periodically by a background task.

pub mod error;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use brentscope_core::config::{DataConfig, ServerConfig};
use brentscope_core::BrentscopeConfig;
use serde_json::json;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, WebError};
pub use store::{Dataset, DatasetStore};

#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<RwLock<DatasetStore>>,
    data: DataConfig,
}

impl AppState {
    /// Load every dataset from `data`.
    pub fn load(data: DataConfig) -> Self {
        let store = DatasetStore::load(&data);
        Self {
            store: Arc::new(RwLock::new(store)),
            data,
        }
    }

    /// Re-read the files and swap the store in one write.
    pub async fn refresh(&self) -> usize {
        let data = self.data.clone();
        let fresh = match tokio::task::spawn_blocking(move || DatasetStore::load(&data)).await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "dataset refresh task failed");
                return self.store.read().await.available();
            }
        };
        let available = fresh.available();
        *self.store.write().await = fresh;
        info!(available, "datasets refreshed");
        available
    }

    pub async fn dataset(&self, dataset: Dataset) -> Result<axum::body::Bytes, ApiError> {
        self.store.read().await.get(dataset)
    }
}

async fn dataset_response(state: AppState, dataset: Dataset) -> Response {
    match state.dataset(dataset).await {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(err) => {
            warn!(dataset = dataset.name(), error = %err, "serving error response");
            err.into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the router; CORS admits GET requests from `cors_origin` only.
pub fn router(state: AppState, cors_origin: &str) -> Result<Router, WebError> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .map_err(|_| WebError::InvalidOrigin(cors_origin.to_owned()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET]);

    let mut app = Router::new().route("/health", get(health));
    for dataset in Dataset::ALL {
        app = app.route(
            &dataset.route(),
            get(move |State(state): State<AppState>| dataset_response(state, dataset)),
        );
    }

    Ok(app
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Reload the datasets every `interval` until the task is aborted.
pub fn spawn_refresh(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.refresh().await;
        }
    })
}

fn listen_addr(server: &ServerConfig) -> String {
    format!("{}:{}", server.host, server.port)
}

/// Load the datasets and serve until the process is stopped.
pub async fn serve(config: &BrentscopeConfig) -> Result<(), WebError> {
    let state = AppState::load(config.data.clone());
    let app = router(state.clone(), &config.server.cors_origin)?;

    let refresh = config
        .server
        .refresh_secs
        .filter(|secs| *secs > 0)
        .map(|secs| spawn_refresh(state, Duration::from_secs(secs)));

    let addr = listen_addr(&config.server);
    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| WebError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local = listener.local_addr().map_err(WebError::Serve)?;
    info!(addr = %local, version = env!("CARGO_PKG_VERSION"), "brentscope-web listening");

    let result = axum::serve(listener, app).await.map_err(WebError::Serve);
    if let Some(handle) = refresh {
        handle.abort();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::fs;
    use tower::ServiceExt;

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("BrentOilprices.csv"),
            "Date,Price\n2020-01-01,50\n2020-01-02,51\n2020-01-03,49\n",
        )
        .expect("prices");
        fs::write(
            dir.path().join("world_data.csv"),
            "date,GDP Growth (%)\n2019-01-01,2.5\n2020-01-01,\n",
        )
        .expect("world data");
        dir
    }

    fn data_config(dir: &tempfile::TempDir) -> DataConfig {
        DataConfig {
            data_dir: dir.path().to_path_buf(),
            ..DataConfig::default()
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn historical_prices_match_the_file() {
        let dir = fixture_dir();
        let app = router(AppState::load(data_config(&dir)), "http://localhost:3000").expect("router");
        let (status, body) = get_json(app, "/api/data/historical-prices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"Date": "2020-01-01", "Price": 50},
                {"Date": "2020-01-02", "Price": 51},
                {"Date": "2020-01-03", "Price": 49}
            ])
        );
    }

    #[tokio::test]
    async fn missing_file_fails_only_its_endpoint() {
        let dir = fixture_dir();
        let app = router(AppState::load(data_config(&dir)), "http://localhost:3000").expect("router");

        let (status, body) = get_json(app.clone(), "/api/data/merged_oil_price_history").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().expect("message").contains("merged_oil_price_history"));

        let (status, body) = get_json(app, "/api/data/events").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[1]["GDP Growth (%)"], Value::Null);
    }

    #[tokio::test]
    async fn forecast_serves_the_world_data_by_default() {
        let dir = fixture_dir();
        let app = router(AppState::load(data_config(&dir)), "http://localhost:3000").expect("router");
        let (_, events) = get_json(app.clone(), "/api/data/events").await;
        let (status, forecast) = get_json(app, "/api/data/forecast").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events, forecast);
    }

    #[tokio::test]
    async fn refresh_picks_up_new_files() {
        let dir = fixture_dir();
        let state = AppState::load(data_config(&dir));
        assert_eq!(state.refresh().await, 3);

        fs::write(
            dir.path().join("merged_data.csv"),
            "Date,GDP Growth (%),Price\n2020-01-01,2.5,50\n",
        )
        .expect("merged");
        assert_eq!(state.refresh().await, 4);

        let app = router(state, "http://localhost:3000").expect("router");
        let (status, body) = get_json(app, "/api/data/merged_oil_price_history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["Price"], 50);
    }

    #[tokio::test]
    async fn cors_allows_the_dashboard_origin() {
        let dir = fixture_dir();
        let app = router(AppState::load(data_config(&dir)), "http://localhost:3000").expect("router");
        let response = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("infallible");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("http://localhost:3000"))
        );
    }

    #[test]
    fn rejects_unparseable_origin() {
        let state = AppState::load(DataConfig::default());
        assert!(matches!(
            router(state, "bad\norigin"),
            Err(WebError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn listen_address_from_config() {
        assert_eq!(listen_addr(&ServerConfig::default()), "127.0.0.1:5000");
    }
}
