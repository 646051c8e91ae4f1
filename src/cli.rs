use clap::{Parser, Subcommand};

use crate::commands;

#[derive(Parser)]
#[command(name = "marketpulse")]
#[command(about = "Market, sentiment, and macro data collection pipeline", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every data source: overview, sentiment, macro, volatility
    Pull,
    /// Build the LLM market overview and append it to the store
    Overview,
    /// Fetch the sentiment survey sheet and upsert it
    Sentiment,
    /// Fetch the unemployment rate series and upsert it
    Macro,
    /// Fetch the latest volatility index close and upsert it
    Vix,
    /// Show row counts for every derived table
    Status,
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Pull => commands::pull::run(),
        Commands::Overview => commands::overview::run(),
        Commands::Sentiment => commands::sentiment::run(),
        Commands::Macro => commands::macro_series::run(),
        Commands::Vix => commands::vix::run(),
        Commands::Status => commands::status::run(),
    }
}
