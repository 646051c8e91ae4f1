//! Spreadsheet API client for the sentiment survey sheet.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::constants::HTTP_TIMEOUT_SECS;
use crate::error::{AppError, Result};

/// Tabular source of raw text cells. The first row is the header.
#[allow(async_fn_in_trait)]
pub trait SheetSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>>;
}

/// Client for the Google Sheets v4 values endpoint, authenticated with an
/// API key.
pub struct SheetsClient {
    client: Client,
    base_url: String,
    api_key: String,
    spreadsheet_id: String,
    range: String,
}

impl SheetsClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .sheets_api_key
            .clone()
            .ok_or_else(|| AppError::Config("SHEETS_API_KEY is not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.sheets_base_url.clone(),
            api_key,
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.sheet_range.clone(),
        })
    }
}

impl SheetSource for SheetsClient {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}?key={}",
            self.base_url, self.spreadsheet_id, self.range, self.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "sheet request returned {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await?;
        let rows = parse_values_payload(&payload);
        info!("fetched {} rows from sheet", rows.len());
        Ok(rows)
    }
}

fn parse_values_payload(payload: &Value) -> Vec<Vec<String>> {
    let Some(values) = payload["values"].as_array() else {
        return Vec::new();
    };
    values
        .iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(cell_to_string).collect())
                .unwrap_or_default()
        })
        .collect()
}

fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_payload_becomes_text_rows() {
        let payload = json!({
            "range": "Sheet1!A1:M",
            "values": [
                ["Reported Date", "Bullish"],
                ["01-04-24", "34,5%"],
                ["01-11-24", null]
            ]
        });
        let rows = parse_values_payload(&payload);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], vec!["01-04-24", "34,5%"]);
        assert_eq!(rows[2][1], "");
    }

    #[test]
    fn missing_values_key_means_no_rows() {
        assert!(parse_values_payload(&json!({ "range": "Sheet1!A1:M" })).is_empty());
    }
}
