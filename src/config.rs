use std::env;
use std::path::PathBuf;

/// Runtime configuration, supplied entirely through environment variables.
///
/// Components receive this struct (or the fields they need) explicitly;
/// nothing reads the environment after startup and there are no process-wide
/// client or connection singletons.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Base URL of the chart API (override for tests).
    pub chart_base_url: String,

    /// Base URL of the spreadsheet API.
    pub sheets_base_url: String,
    pub sheets_api_key: Option<String>,
    pub spreadsheet_id: String,
    pub sheet_range: String,

    /// Base URL of the macro-data API.
    pub fred_base_url: String,
    pub fred_api_key: Option<String>,

    /// Base URL of the completion API.
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_path: env::var("MARKETPULSE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("marketpulse.db")),
            chart_base_url: var_or("CHART_BASE_URL", "https://query1.finance.yahoo.com"),
            sheets_base_url: var_or("SHEETS_BASE_URL", "https://sheets.googleapis.com"),
            sheets_api_key: env::var("SHEETS_API_KEY").ok(),
            spreadsheet_id: var_or(
                "SHEETS_SPREADSHEET_ID",
                "14Om8hHNuufjWj7dsFKLkpwHH1zuYQ31hIghUJUODn5Q",
            ),
            sheet_range: var_or("SHEETS_RANGE", "Sheet1!A1:M"),
            fred_base_url: var_or("FRED_BASE_URL", "https://api.stlouisfed.org"),
            fred_api_key: env::var("FRED_API_KEY").ok(),
            openai_base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com"),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_model: var_or("OPENAI_MODEL", "gpt-4o"),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
