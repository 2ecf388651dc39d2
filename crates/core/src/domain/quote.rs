use crate::domain::asset::Asset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Per-asset view of the current window, built once by the market data
/// adapter and read-only for the remainder of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub asset: Asset,
    /// First close of the window (the original comparator base).
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    /// (close - open) / open * 100, 2 decimals.
    pub variation: f64,
    /// Variation over the first half of the ten-sample window.
    pub prior_variation: f64,
    pub mean_volume: f64,
    /// Sample std-dev of day-over-day returns, in percent.
    pub volatility: f64,
    /// Worst peak-to-trough move in the window, always <= 0.
    pub drawdown: f64,
    /// Wilder-style RSI in [0, 100]; 50.0 on short or degenerate series.
    pub rsi: f64,
    pub history: Vec<PricePoint>,
}

impl QuoteSnapshot {
    pub fn price_label(&self) -> String {
        format!("{} {:.2}", self.asset.currency_prefix(), self.close)
    }
}

/// Named macro reference (benchmark index, currency pair, crypto reference)
/// with its period variation and current level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPoint {
    pub name: String,
    pub variation: f64,
    pub level: f64,
}
