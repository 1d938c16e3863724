// Shared fixtures for the behaviour tests
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub use brentscope_core::config::DataConfig;
pub use brentscope_core::http_client::{HttpResponse, StaticHttpClient};
use brentscope_core::retry::RetryConfig;
pub use brentscope_core::{DataExtractor, Indicator, WorldBankSource};
use chrono::NaiveDate;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn data_config(dir: &Path) -> DataConfig {
    DataConfig {
        data_dir: dir.to_path_buf(),
        ..DataConfig::default()
    }
}

/// Extractor over canned World Bank responses, without retries.
pub fn offline_extractor(client: StaticHttpClient) -> DataExtractor {
    let source = WorldBankSource::with_http_client(Arc::new(client))
        .with_base_url("https://wb.test/v2")
        .with_retry(RetryConfig::no_retry());
    DataExtractor::new(Arc::new(source), "WLD")
}

/// `n` daily prices with a level shift at `n / 2` and deterministic noise.
pub fn shifted_prices(n: usize) -> Vec<(NaiveDate, f64)> {
    let start = ymd(2000, 1, 3);
    let mut seed = 7u64;
    start
        .iter_days()
        .take(n)
        .enumerate()
        .map(|(i, date)| {
            seed = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let noise = ((seed >> 11) as f64 / (1u64 << 53) as f64) - 0.5;
            let level = if i < n / 2 { 30.0 } else { 80.0 };
            (date, level + (i as f64 * 0.7).sin() + 2.0 * noise)
        })
        .collect()
}

pub fn write_price_csv(path: &Path, rows: &[(NaiveDate, f64)]) {
    let mut body = String::from("Date,Price\n");
    for (date, price) in rows {
        body.push_str(&format!("{},{price:.3}\n", date.format("%d-%b-%y")));
    }
    fs::write(path, body).expect("write price fixture");
}
