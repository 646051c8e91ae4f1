//! Macro-data API client (FRED series observations).

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::{AppError, Result};

/// One dated observation, value kept as raw text. FRED reports missing
/// values as "." and the normalizer decides what counts as missing.
#[derive(Debug, Clone)]
pub struct MacroObservation {
    pub date: NaiveDate,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ObservationsPayload {
    observations: Vec<WireObservation>,
}

#[derive(Debug, Deserialize)]
struct WireObservation {
    date: String,
    value: String,
}

#[allow(async_fn_in_trait)]
pub trait MacroSource {
    async fn fetch_observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MacroObservation>>;
}

pub struct FredClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .fred_api_key
            .clone()
            .ok_or_else(|| AppError::Config("FRED_API_KEY is not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.fred_base_url.clone(),
            api_key,
        })
    }
}

impl MacroSource for FredClient {
    async fn fetch_observations(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MacroObservation>> {
        let url = format!(
            "{}/fred/series/observations?series_id={}&api_key={}&file_type=json&observation_start={}&observation_end={}",
            self.base_url, series_id, self.api_key, start, end
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "observations request for {} returned {}",
                series_id,
                response.status()
            )));
        }

        let payload: ObservationsPayload = response.json().await.map_err(|e| {
            AppError::Network(format!("malformed observations payload for {}: {}", series_id, e))
        })?;
        Ok(convert_observations(series_id, payload))
    }
}

fn convert_observations(series_id: &str, payload: ObservationsPayload) -> Vec<MacroObservation> {
    let mut parsed = Vec::with_capacity(payload.observations.len());
    for item in payload.observations {
        let Ok(date) = NaiveDate::parse_from_str(&item.date, "%Y-%m-%d") else {
            warn!("{}: skipping observation with bad date '{}'", series_id, item.date);
            continue;
        };
        parsed.push(MacroObservation {
            date,
            value: item.value,
        });
    }
    parsed
}
