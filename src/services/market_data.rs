//! Chart API client for quote history.

use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::models::RawObservation;

/// Quote history provider. An empty result means "no data for that entity",
/// not an error; errors are reserved for transport and malformed payloads.
#[allow(async_fn_in_trait)]
pub trait MarketDataSource {
    async fn fetch_history(&self, entity: &str, lookback_days: u32) -> Result<Vec<RawObservation>>;
    async fn fetch_latest_quote(&self, entity: &str) -> Result<Option<RawObservation>>;
}

/// Client for a Yahoo-style chart endpoint
/// (`/v8/finance/chart/{symbol}?range=..&interval=1d`).
pub struct ChartClient {
    client: Client,
    base_url: String,
}

impl ChartClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn fetch_chart(&self, entity: &str, range: &str) -> Result<Vec<RawObservation>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url, entity, range
        );
        debug!("fetching chart data for {} ({})", entity, range);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "chart request for {} returned {}",
                entity,
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        parse_chart_payload(entity, &payload)
    }
}

impl MarketDataSource for ChartClient {
    async fn fetch_history(&self, entity: &str, lookback_days: u32) -> Result<Vec<RawObservation>> {
        self.fetch_chart(entity, &format!("{}d", lookback_days)).await
    }

    async fn fetch_latest_quote(&self, entity: &str) -> Result<Option<RawObservation>> {
        let mut observations = self.fetch_chart(entity, "1d").await?;
        Ok(observations.pop())
    }
}

/// Turn a chart payload into per-day raw observations. Rows keep their
/// untyped open/close values (possibly null); normalization happens later.
fn parse_chart_payload(entity: &str, payload: &Value) -> Result<Vec<RawObservation>> {
    let result = payload["chart"]["result"].get(0).ok_or_else(|| {
        AppError::Network(format!("malformed chart payload for {}", entity))
    })?;

    let timestamps = result["timestamp"].as_array().cloned().unwrap_or_default();
    let quote = &result["indicators"]["quote"][0];
    let opens = quote["open"].as_array().cloned().unwrap_or_default();
    let closes = quote["close"].as_array().cloned().unwrap_or_default();

    let mut observations = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(secs) = ts.as_i64() else {
            warn!("{}: non-integer timestamp at index {}", entity, i);
            continue;
        };
        let Some(date) = DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive()) else {
            warn!("{}: out-of-range timestamp {}", entity, secs);
            continue;
        };
        let observation = RawObservation::new(entity, date)
            .with_field("open", opens.get(i).cloned().unwrap_or(Value::Null))
            .with_field("close", closes.get(i).cloned().unwrap_or(Value::Null));
        observations.push(observation);
    }

    Ok(observations)
}
