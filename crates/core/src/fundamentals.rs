//! Fundamentals normalization and the quarter-over-quarter earnings
//! comparison. Everything here returns defaulted values instead of errors;
//! missing data must surface as "N/D" downstream, never as a placeholder
//! number.

use crate::domain::asset::Asset;
use crate::domain::fundamentals::{EarningsComparison, FundamentalSnapshot};
use crate::indicators::{round1, round2};
use crate::ingest::types::{CalendarWire, FinancialsResponse, FundamentalsResponse, QuarterWire};
use chrono::NaiveDate;

/// Yields above this are treated as provider data errors and zeroed.
/// Data-quality heuristic inherited from the upstream feed, not a verified
/// financial rule.
pub const DIVIDEND_YIELD_CEILING: f64 = 30.0;

pub fn normalize(wire: FundamentalsResponse) -> FundamentalSnapshot {
    let dy = round2(wire.dividend_yield.unwrap_or(0.0) * 100.0);
    FundamentalSnapshot {
        pe: round2(wire.trailing_pe.unwrap_or(0.0)),
        price_to_book: round2(wire.price_to_book.unwrap_or(0.0)),
        dividend_yield: if dy <= DIVIDEND_YIELD_CEILING { dy } else { 0.0 },
        market_cap: wire.market_cap.unwrap_or(0.0),
        roe: round2(wire.return_on_equity.unwrap_or(0.0) * 100.0),
        debt_to_equity: round2(wire.debt_to_equity.unwrap_or(0.0)),
        target_mean_price: round2(wire.target_mean_price.unwrap_or(0.0)),
        target_low_price: round2(wire.target_low_price.unwrap_or(0.0)),
        target_high_price: round2(wire.target_high_price.unwrap_or(0.0)),
        recommendation: wire
            .recommendation
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "N/D".to_string()),
    }
}

/// Percentage delta between the latest and prior figure, 1 decimal.
/// `None` unless both are present and non-zero: a reported 0.0 is far more
/// likely a provider placeholder than a real quarter, and a delta must
/// never be derived from a single usable value.
pub fn quarter_delta(latest: Option<f64>, prior: Option<f64>) -> Option<f64> {
    let latest = latest.filter(|v| *v != 0.0)?;
    let prior = prior.filter(|v| *v != 0.0)?;
    Some(round1((latest - prior) / prior.abs() * 100.0))
}

pub fn compare_quarters(asset: &Asset, resp: &FinancialsResponse) -> EarningsComparison {
    let (rev_latest, rev_prior) = latest_two(&resp.quarters, |q| q.total_revenue);
    let (ni_latest, ni_prior) = latest_two(&resp.quarters, |q| q.net_income);

    EarningsComparison {
        ticker: asset.ticker.clone(),
        name: asset.name.clone(),
        sector: asset.sector.clone(),
        latest_revenue: rev_latest,
        latest_net_income: ni_latest,
        revenue_delta: quarter_delta(rev_latest, rev_prior),
        net_income_delta: quarter_delta(ni_latest, ni_prior),
        reported_at: resp.quarters.first().map(|q| q.period_end),
        next_earnings_date: resp.calendar.as_ref().and_then(next_earnings_date),
    }
}

/// Resolves the dict-or-table calendar quirk once; any lookup miss is
/// simply "to be confirmed" (`None`).
pub fn next_earnings_date(calendar: &CalendarWire) -> Option<NaiveDate> {
    match calendar {
        CalendarWire::Mapping { earnings_dates } => earnings_dates.first().copied(),
        CalendarWire::Table(rows) => rows
            .iter()
            .find(|row| row.label == "Earnings Date")
            .and_then(|row| row.dates.first().copied()),
    }
}

/// First two usable figures scanning most-recent-first. Both slots stay
/// empty when fewer than two quarters report the series.
fn latest_two<F>(quarters: &[QuarterWire], pick: F) -> (Option<f64>, Option<f64>)
where
    F: Fn(&QuarterWire) -> Option<f64>,
{
    let mut values = quarters.iter().filter_map(pick);
    match (values.next(), values.next()) {
        (Some(a), Some(b)) => (Some(a), Some(b)),
        _ => (None, None),
    }
}
