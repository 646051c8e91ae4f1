use crate::commands::print_source_report;
use crate::config::Config;
use crate::constants::DEFAULT_TICKERS;
use crate::error::Result;
use crate::models::SourceReport;
use crate::pipeline::IngestionPipeline;
use crate::services::{ChartClient, MarketStore, OpenAiSummarizer};

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
        Ok(report) => print_source_report(&report),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

async fn execute(config: &Config) -> Result<SourceReport> {
    let chart = ChartClient::new(&config.chart_base_url)?;
    let summarizer = OpenAiSummarizer::from_config(config)?;
    let entities: Vec<String> = DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect();

    let store = MarketStore::connect(&config.database_path).await?;
    let report = IngestionPipeline::new(&store)
        .run_market_overview(&chart, &summarizer, &entities)
        .await;
    store.close().await;
    Ok(report)
}
