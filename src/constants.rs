//! Shared constants: analysis windows, lookback periods, tracked entities.

/// Short moving-average window (periods).
pub const MA_SHORT: usize = 5;

/// Medium moving-average window (periods).
pub const MA_MEDIUM: usize = 20;

/// Long moving-average window (periods).
pub const MA_LONG: usize = 50;

/// Calendar days of history fetched per entity. Roughly three months,
/// enough trading days to fill the longest moving-average window.
pub const MARKET_LOOKBACK_DAYS: u32 = 90;

/// Lookback window for macro series (two years).
pub const MACRO_LOOKBACK_DAYS: i64 = 730;

/// Call-level timeout applied to every outbound HTTP request.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Volatility index symbol.
pub const VIX_SYMBOL: &str = "^VIX";

/// Unemployment rate series id on the macro-data API.
pub const UNEMPLOYMENT_SERIES: &str = "UNRATE";

/// Entities tracked for the market overview: broad indices, commodities,
/// FX, crypto, rates, and sector ETFs.
pub const DEFAULT_TICKERS: &[&str] = &[
    "^GSPC",    // S&P 500
    "^DJI",     // Dow Jones
    "^IXIC",    // NASDAQ
    "^RUT",     // Russell 2000
    "^GDAXI",   // DAX
    "^FTSE",    // FTSE 100
    "^N225",    // Nikkei 225
    "^HSI",     // Hang Seng
    "GC=F",     // Gold
    "SI=F",     // Silver
    "CL=F",     // Crude Oil WTI
    "EURUSD=X", // Euro / USD
    "JPY=X",    // Yen / USD
    "BTC-USD",  // Bitcoin
    "ETH-USD",  // Ethereum
    "^TNX",     // 10-year treasury yield
    "^VIX",     // Volatility index
    "QQQ",      // Technology
    "XLE",      // Energy
    "XLF",      // Financials
    "XLV",      // Healthcare
    "XLP",      // Consumer staples
    "XLY",      // Consumer discretionary
    "XLI",      // Industrials
    "XLRE",     // Real estate
    "SOXX",     // Semiconductors
];
