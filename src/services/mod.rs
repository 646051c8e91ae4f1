pub mod macro_api;
pub mod market_data;
pub mod normalize;
pub mod sheets;
pub mod store;
pub mod summarizer;

pub use macro_api::{FredClient, MacroObservation, MacroSource};
pub use market_data::{ChartClient, MarketDataSource};
pub use sheets::{SheetSource, SheetsClient};
pub use store::{
    MarketStore, TableSpec, UpsertReport, SENTIMENT_TABLE, UNEMPLOYMENT_TABLE, VIX_TABLE,
};
pub use summarizer::{NarrativeSummarizer, OpenAiSummarizer};
