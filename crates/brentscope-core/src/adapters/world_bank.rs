use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::data_source::{ExtractionError, IndicatorRequest, IndicatorSource, Observation};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";
pub const DEFAULT_PER_PAGE: u32 = 1000;
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// World Bank Indicators API (v2) source.
///
/// Annual observations are dated January 1st of their year. Paged responses
/// are followed until the last page.
#[derive(Clone)]
pub struct WorldBankSource {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    per_page: u32,
    timeout_ms: u64,
    retry: RetryConfig,
}

impl Default for WorldBankSource {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl WorldBankSource {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: DEFAULT_BASE_URL.to_owned(),
            per_page: DEFAULT_PER_PAGE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn indicator_url(&self, request: &IndicatorRequest, page: u32) -> String {
        let (first_year, last_year) = request.window.years();
        format!(
            "{}/country/{}/indicator/{}?format=json&per_page={}&page={}&date={}:{}",
            self.base_url,
            urlencoding::encode(&request.country),
            urlencoding::encode(&request.indicator.code),
            self.per_page,
            page,
            first_year,
            last_year
        )
    }

    async fn get_with_retry(&self, url: &str) -> Result<HttpResponse, ExtractionError> {
        let mut attempt = 0u32;
        loop {
            let request = HttpRequest::get(url)
                .with_header("accept", "application/json")
                .with_timeout_ms(self.timeout_ms);

            let error = match self.http_client.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let error = status_error(response.status);
                    if !self.retry.should_retry_status(response.status) {
                        return Err(error);
                    }
                    error
                }
                Err(transport) if transport.retryable() => ExtractionError::unavailable(format!(
                    "world bank transport error: {}",
                    transport.message()
                )),
                Err(transport) => {
                    return Err(ExtractionError::invalid_request(format!(
                        "world bank transport error: {}",
                        transport.message()
                    )))
                }
            };

            if !self.retry.allows_retry(attempt) {
                return Err(error);
            }
            let delay = self.retry.delay_for_attempt(attempt);
            warn!(
                url,
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying world bank request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn fetch_observations(
        &self,
        request: IndicatorRequest,
    ) -> Result<Vec<Observation>, ExtractionError> {
        let mut observations = Vec::new();
        let mut page = 1u32;

        loop {
            let url = self.indicator_url(&request, page);
            let response = self.get_with_retry(&url).await?;
            let parsed = parse_page(&response.body, &request.indicator.code)?;
            debug!(
                indicator = %request.indicator.code,
                page,
                pages = parsed.pages,
                rows = parsed.observations.len(),
                "world bank page received"
            );

            observations.extend(
                parsed
                    .observations
                    .into_iter()
                    .filter(|observation| request.window.contains(observation.date)),
            );

            if page >= parsed.pages {
                break;
            }
            page += 1;
        }

        Ok(observations)
    }
}

impl IndicatorSource for WorldBankSource {
    fn name(&self) -> &'static str {
        "world_bank"
    }

    fn observations<'a>(
        &'a self,
        request: IndicatorRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Observation>, ExtractionError>> + Send + 'a>> {
        Box::pin(self.fetch_observations(request))
    }
}

fn status_error(status: u16) -> ExtractionError {
    match status {
        429 => ExtractionError::rate_limited("world bank rate limited the request (429)"),
        400..=499 => ExtractionError::rejected(format!("world bank rejected the request ({status})")),
        _ => ExtractionError::unavailable(format!("world bank returned status {status}")),
    }
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(default, deserialize_with = "lenient_u32")]
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug)]
struct ParsedPage {
    pages: u32,
    observations: Vec<Observation>,
}

/// `pages` arrives as a number or a numeric string depending on the endpoint.
fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1),
        Value::String(text) => text.trim().parse().unwrap_or(1),
        _ => 1,
    })
}

fn parse_page(body: &str, code: &str) -> Result<ParsedPage, ExtractionError> {
    let payload: Value = serde_json::from_str(body).map_err(|e| {
        ExtractionError::malformed(format!("world bank response for '{code}' is not json: {e}"))
    })?;

    let Value::Array(mut parts) = payload else {
        return Err(ExtractionError::malformed(format!(
            "world bank response for '{code}' is not an array"
        )));
    };

    if let Some(messages) = parts.first().and_then(|meta| meta.get("message")) {
        let messages: Vec<ErrorMessage> =
            serde_json::from_value(messages.clone()).unwrap_or_default();
        let detail = messages
            .iter()
            .map(|m| format!("{} {}: {}", m.id, m.key, m.value).trim().to_owned())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ExtractionError::rejected(format!(
            "world bank rejected indicator '{code}': {detail}"
        )));
    }

    if parts.len() < 2 {
        return Err(ExtractionError::malformed(format!(
            "world bank response for '{code}' has no data section"
        )));
    }

    let rows = parts.swap_remove(1);
    let meta: PageMeta = serde_json::from_value(parts.swap_remove(0)).map_err(|e| {
        ExtractionError::malformed(format!("world bank paging metadata for '{code}': {e}"))
    })?;

    let raw: Vec<RawObservation> = match rows {
        Value::Null => Vec::new(),
        other => serde_json::from_value(other).map_err(|e| {
            ExtractionError::malformed(format!("world bank rows for '{code}': {e}"))
        })?,
    };

    let mut observations = Vec::with_capacity(raw.len());
    for row in raw {
        let Some(date) = period_start(&row.date) else {
            warn!(indicator = code, date = %row.date, "skipping unparseable world bank period");
            continue;
        };
        observations.push(Observation {
            date,
            value: row.value.filter(|v| v.is_finite()),
        });
    }

    Ok(ParsedPage {
        pages: meta.pages.max(1),
        observations,
    })
}

/// First day of a World Bank period label: `2023`, `2023M07` or `2023Q3`.
fn period_start(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    let year: i32 = label.get(..4)?.parse().ok()?;
    let rest = label.get(4..).unwrap_or("");

    let month = match rest.chars().next() {
        None => 1,
        Some('M') => rest.get(1..)?.parse::<u32>().ok()?,
        Some('Q') => {
            let quarter = rest.get(1..)?.parse::<u32>().ok()?;
            quarter.checked_sub(1)?.checked_mul(3)? + 1
        }
        Some(_) => return None,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}
