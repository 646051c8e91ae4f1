use crate::commands::print_source_report;
use crate::config::Config;
use crate::constants::UNEMPLOYMENT_SERIES;
use crate::error::Result;
use crate::models::SourceReport;
use crate::pipeline::IngestionPipeline;
use crate::services::{FredClient, MarketStore, UNEMPLOYMENT_TABLE};

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
    let fred = FredClient::from_config(config)?;
    let store = MarketStore::connect(&config.database_path).await?;
    let report = IngestionPipeline::new(&store)
        .run_macro_series(&fred, UNEMPLOYMENT_SERIES, &UNEMPLOYMENT_TABLE)
        .await;
    store.close().await;
    Ok(report)
}
