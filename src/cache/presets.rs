//! TTL presets for the dashboard's data kinds.

use std::fmt;

/// How quickly a kind of upstream data goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    /// Intraday quotes from the market-data provider
    StockPrice,
    /// Index levels and market capitalization
    MarketData,
    /// News listings and articles
    NewsFeed,
    /// Quarterly financial statements
    Financials,
}

impl DataClass {
    pub const ALL: [DataClass; 4] = [
        DataClass::StockPrice,
        DataClass::MarketData,
        DataClass::NewsFeed,
        DataClass::Financials,
    ];

    /// TTL in seconds.
    pub fn ttl(self) -> u64 {
        match self {
            DataClass::StockPrice => 30,
            DataClass::MarketData => 300,
            DataClass::NewsFeed => 600,
            DataClass::Financials => 3600,
        }
    }

    /// Conventional base-key prefix for memoized calls of this class.
    pub fn prefix(self) -> &'static str {
        match self {
            DataClass::StockPrice => "stock",
            DataClass::MarketData => "market",
            DataClass::NewsFeed => "news",
            DataClass::Financials => "financial",
        }
    }
}

impl fmt::Display for DataClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
