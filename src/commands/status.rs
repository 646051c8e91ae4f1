use crate::config::Config;
use crate::error::Result;
use crate::services::MarketStore;

const TABLES: &[&str] = &[
    "market_overview",
    "aaii_sentiment_data",
    "unemployment_data",
    "vix_data",
];

pub fn run() {
    let config = Config::from_env();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(execute(&config)) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn execute(config: &Config) -> Result<()> {
    let store = MarketStore::connect(&config.database_path).await?;

    println!("Database: {}", config.database_path.display());
    for table in TABLES {
        match store.row_count(table).await {
            Ok(count) => println!("  {:<24} {} rows", table, count),
            Err(_) => println!("  {:<24} (not created yet)", table),
        }
    }

    store.close().await;
    Ok(())
}
