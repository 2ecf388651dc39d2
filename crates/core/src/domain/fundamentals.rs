use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalized valuation multiples for one asset. Missing numerics are 0;
/// the dividend yield is zeroed above the sanity ceiling (see
/// `fundamentals::DIVIDEND_YIELD_CEILING`). Fetched lazily, per selected
/// asset, never persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub pe: f64,
    pub price_to_book: f64,
    pub dividend_yield: f64,
    pub market_cap: f64,
    pub roe: f64,
    pub debt_to_equity: f64,
    pub target_mean_price: f64,
    pub target_low_price: f64,
    pub target_high_price: f64,
    pub recommendation: String,
}

impl FundamentalSnapshot {
    /// The all-defaults snapshot used when the provider call fails.
    pub fn unavailable() -> Self {
        Self {
            pe: 0.0,
            price_to_book: 0.0,
            dividend_yield: 0.0,
            market_cap: 0.0,
            roe: 0.0,
            debt_to_equity: 0.0,
            target_mean_price: 0.0,
            target_low_price: 0.0,
            target_high_price: 0.0,
            recommendation: "N/D".to_string(),
        }
    }
}

/// Latest vs prior reported quarter. Deltas stay `None` unless two usable
/// figures exist; they are never computed from a single data point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsComparison {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub latest_revenue: Option<f64>,
    pub latest_net_income: Option<f64>,
    pub revenue_delta: Option<f64>,
    pub net_income_delta: Option<f64>,
    /// Period end of the latest reported quarter.
    pub reported_at: Option<NaiveDate>,
    pub next_earnings_date: Option<NaiveDate>,
}

impl EarningsComparison {
    pub fn next_date_label(&self) -> String {
        match self.next_earnings_date {
            Some(d) => d.to_string(),
            None => "A confirmar".to_string(),
        }
    }

    pub fn reported_label(&self) -> String {
        match self.reported_at {
            Some(d) => d.to_string(),
            None => "N/D".to_string(),
        }
    }
}

/// One recent dividend record for an asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendPayment {
    pub ticker: String,
    pub name: String,
    pub date: NaiveDate,
    pub amount: f64,
}
