use crate::commands::print_reports;
use crate::config::Config;
use crate::constants::{DEFAULT_TICKERS, UNEMPLOYMENT_SERIES};
use crate::error::Result;
use crate::models::SourceReport;
use crate::pipeline::IngestionPipeline;
use crate::services::{
    ChartClient, FredClient, MarketStore, OpenAiSummarizer, SheetsClient, UNEMPLOYMENT_TABLE,
};

/// Run every data source against one store handle. A source whose client
/// cannot be configured (missing credential, unbuildable HTTP client) is
/// reported as failed and the remaining sources still run; only an
/// unreachable store aborts the run.
pub fn run() {
    let config = Config::from_env();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(execute(&config)) {
        Ok(reports) => print_reports(&reports),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

async fn execute(config: &Config) -> Result<Vec<SourceReport>> {
    let store = MarketStore::connect(&config.database_path).await?;
    let reports = run_sources(config, &store).await;
    store.close().await;
    Ok(reports)
}

async fn run_sources(config: &Config, store: &MarketStore) -> Vec<SourceReport> {
    let pipeline = IngestionPipeline::new(store);
    let chart = ChartClient::new(&config.chart_base_url);
    let entities: Vec<String> = DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect();

    let mut reports = Vec::with_capacity(4);

    match (&chart, OpenAiSummarizer::from_config(config)) {
        (Ok(chart), Ok(summarizer)) => {
            reports.push(
                pipeline
                    .run_market_overview(chart, &summarizer, &entities)
                    .await,
            );
        }
        (Err(e), _) => reports.push(SourceReport::failed("market_overview", e.to_string())),
        (_, Err(e)) => reports.push(SourceReport::failed("market_overview", e.to_string())),
    }

    match SheetsClient::from_config(config) {
        Ok(sheet) => reports.push(pipeline.run_sentiment(&sheet).await),
        Err(e) => reports.push(SourceReport::failed("aaii_sentiment_data", e.to_string())),
    }

    match FredClient::from_config(config) {
        Ok(fred) => {
            reports.push(
                pipeline
                    .run_macro_series(&fred, UNEMPLOYMENT_SERIES, &UNEMPLOYMENT_TABLE)
                    .await,
            );
        }
        Err(e) => reports.push(SourceReport::failed("unemployment_data", e.to_string())),
    }

    match &chart {
        Ok(chart) => reports.push(pipeline.run_vix(chart).await),
        Err(e) => reports.push(SourceReport::failed("vix_data", e.to_string())),
    }

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceOutcome;
    use tempfile::tempdir;

    fn bare_config(dir: &tempfile::TempDir) -> Config {
        Config {
            database_path: dir.path().join("test.db"),
            // Connection refused immediately; no route leaves the host
            chart_base_url: "http://127.0.0.1:9".into(),
            sheets_base_url: "http://127.0.0.1:9".into(),
            sheets_api_key: None,
            spreadsheet_id: "sheet".into(),
            sheet_range: "Sheet1!A1:M".into(),
            fred_base_url: "http://127.0.0.1:9".into(),
            fred_api_key: None,
            openai_base_url: "http://127.0.0.1:9".into(),
            openai_api_key: None,
            openai_model: "gpt-4o".into(),
        }
    }

    #[tokio::test]
    async fn unconfigured_sources_fail_without_aborting_the_rest() {
        let dir = tempdir().unwrap();
        let config = bare_config(&dir);
        let store = MarketStore::connect(&config.database_path).await.unwrap();

        let reports = run_sources(&config, &store).await;

        let sources: Vec<&str> = reports.iter().map(|r| r.source).collect();
        assert_eq!(
            sources,
            vec![
                "market_overview",
                "aaii_sentiment_data",
                "unemployment_data",
                "vix_data"
            ]
        );
        for report in &reports {
            assert!(
                matches!(report.outcome, SourceOutcome::Failed(_)),
                "{} should fail without credentials or a reachable endpoint",
                report.source
            );
        }
        store.close().await;
    }
}
