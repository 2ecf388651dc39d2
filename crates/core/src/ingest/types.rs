//! Wire shapes for the market data service. Every optional provider field
//! is an explicit `Option` here and resolved exactly once by the adapter;
//! downstream code never branches on raw provider shape.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsResponse {
    pub trailing_pe: Option<f64>,
    pub price_to_book: Option<f64>,
    /// Fraction (0.065 = 6.5%), scaled to percent by the normalizer.
    pub dividend_yield: Option<f64>,
    pub market_cap: Option<f64>,
    /// Fraction, scaled to percent by the normalizer.
    pub return_on_equity: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub target_mean_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendsResponse {
    pub payments: Vec<DividendWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendWire {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    pub items: Vec<NewsWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsWire {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialsResponse {
    /// Most recent quarter first.
    pub quarters: Vec<QuarterWire>,
    pub calendar: Option<CalendarWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterWire {
    pub period_end: NaiveDate,
    pub total_revenue: Option<f64>,
    pub net_income: Option<f64>,
}

/// The provider presents the earnings calendar either as a mapping or as
/// tabular rows, depending on upstream source. Resolved to a single
/// `Option<NaiveDate>` by `fundamentals::next_earnings_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalendarWire {
    Mapping {
        earnings_dates: Vec<NaiveDate>,
    },
    Table(Vec<CalendarRow>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarRow {
    pub label: String,
    pub dates: Vec<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_candles_with_missing_fields() {
        let v = json!({
            "symbol": "PETR3.SA",
            "candles": [
                {"date": "2026-07-27", "open": 38.1, "high": 38.9, "low": 37.8, "close": 38.5, "volume": 1000.0},
                {"date": "2026-07-28", "close": null}
            ]
        });
        let parsed: HistoryResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.candles.len(), 2);
        assert_eq!(parsed.candles[0].close, Some(38.5));
        assert!(parsed.candles[1].close.is_none());
        assert!(parsed.candles[1].volume.is_none());
    }

    #[test]
    fn calendar_accepts_mapping_shape() {
        let v = json!({"earnings_dates": ["2026-08-12"]});
        let parsed: CalendarWire = serde_json::from_value(v).unwrap();
        assert!(matches!(parsed, CalendarWire::Mapping { .. }));
    }

    #[test]
    fn calendar_accepts_table_shape() {
        let v = json!([{"label": "Earnings Date", "dates": ["2026-08-12", "2026-08-14"]}]);
        let parsed: CalendarWire = serde_json::from_value(v).unwrap();
        assert!(matches!(parsed, CalendarWire::Table(rows) if rows.len() == 1));
    }
}
