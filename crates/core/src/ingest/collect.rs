//! Collection layer: turns raw provider responses into the run's domain
//! snapshot. Every per-asset failure is swallowed here; the asset is
//! excluded (logged at warn) and the run continues with what succeeded.

use crate::domain::asset::{Asset, AssetKind};
use crate::domain::fundamentals::{DividendPayment, EarningsComparison, FundamentalSnapshot};
use crate::domain::news::NewsItem;
use crate::domain::quote::{CorrelationPoint, PricePoint, QuoteSnapshot};
use crate::fundamentals;
use crate::indicators;
use crate::ingest::provider::{HistoryRange, MarketDataProvider};
use crate::ingest::types::Candle;
use anyhow::Result;

pub const NEWS_LIMIT: usize = 5;
pub const DIVIDENDS_PER_ASSET: usize = 3;

/// Macro references shown alongside the portfolio.
const CORRELATION_REFS: &[(&str, &str)] = &[
    ("IBOV", "^BVSP"),
    ("Dólar", "USDBRL=X"),
    ("BTC", "BTC-USD"),
];

pub async fn collect_quotes(
    provider: &dyn MarketDataProvider,
    watchlist: &[Asset],
) -> Vec<QuoteSnapshot> {
    let mut out = Vec::with_capacity(watchlist.len());
    for asset in watchlist {
        match quote_for_asset(provider, asset).await {
            Ok(snapshot) => out.push(snapshot),
            Err(err) => {
                tracing::warn!(symbol = %asset.symbol, error = %err, "quote fetch failed; excluding asset");
            }
        }
    }

    out.sort_by(|a, b| {
        b.variation
            .partial_cmp(&a.variation)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.asset.ticker.cmp(&b.asset.ticker))
    });
    out
}

async fn quote_for_asset(
    provider: &dyn MarketDataProvider,
    asset: &Asset,
) -> Result<QuoteSnapshot> {
    let short = provider
        .fetch_history(&asset.symbol, HistoryRange::FiveDays)
        .await?;
    let monthly = provider
        .fetch_history(&asset.symbol, HistoryRange::OneMonth)
        .await?;
    let ten_day = provider
        .fetch_history(&asset.symbol, HistoryRange::TenDays)
        .await?;

    let history = closed_points(&short.candles);
    anyhow::ensure!(
        history.len() >= 2,
        "history too short for {} ({} closes)",
        asset.symbol,
        history.len()
    );

    let closes: Vec<f64> = history.iter().map(|p| p.price).collect();
    let open = closes[0];
    let close = closes[closes.len() - 1];

    let high = short
        .candles
        .iter()
        .filter_map(|c| c.high.or(c.close))
        .fold(f64::MIN, f64::max);
    let low = short
        .candles
        .iter()
        .filter_map(|c| c.low.or(c.close))
        .fold(f64::MAX, f64::min);

    let volumes: Vec<f64> = short.candles.iter().filter_map(|c| c.volume).collect();
    let mean_volume = if volumes.is_empty() {
        0.0
    } else {
        (volumes.iter().sum::<f64>() / volumes.len() as f64).round()
    };

    let monthly_closes: Vec<f64> = closed_points(&monthly.candles)
        .iter()
        .map(|p| p.price)
        .collect();
    let ten_day_closes: Vec<f64> = closed_points(&ten_day.candles)
        .iter()
        .map(|p| p.price)
        .collect();

    Ok(QuoteSnapshot {
        asset: asset.clone(),
        open: indicators::round2(open),
        close: indicators::round2(close),
        high: indicators::round2(high),
        low: indicators::round2(low),
        variation: indicators::variation(open, close),
        prior_variation: indicators::prior_period_variation(&ten_day_closes),
        mean_volume,
        volatility: indicators::volatility(&closes),
        drawdown: indicators::drawdown(low, high),
        rsi: indicators::rsi(&monthly_closes, indicators::RSI_PERIOD),
        history,
    })
}

pub async fn collect_correlations(provider: &dyn MarketDataProvider) -> Vec<CorrelationPoint> {
    let mut out = Vec::new();
    for (name, symbol) in CORRELATION_REFS {
        match provider.fetch_history(symbol, HistoryRange::FiveDays).await {
            Ok(resp) => {
                let closes: Vec<f64> =
                    closed_points(&resp.candles).iter().map(|p| p.price).collect();
                if closes.len() < 2 {
                    tracing::warn!(symbol, "correlation series too short; skipping");
                    continue;
                }
                let last = closes[closes.len() - 1];
                out.push(CorrelationPoint {
                    name: (*name).to_string(),
                    variation: indicators::variation(closes[0], last),
                    level: indicators::round2(last),
                });
            }
            Err(err) => {
                tracing::warn!(symbol, error = %err, "correlation fetch failed; skipping");
            }
        }
    }
    out
}

pub async fn collect_dividends(
    provider: &dyn MarketDataProvider,
    watchlist: &[Asset],
) -> Vec<DividendPayment> {
    let mut out = Vec::new();
    for asset in watchlist {
        match provider.fetch_dividends(&asset.symbol).await {
            Ok(resp) => {
                let mut payments = resp.payments;
                payments.sort_by(|a, b| b.date.cmp(&a.date));
                for p in payments.into_iter().take(DIVIDENDS_PER_ASSET) {
                    out.push(DividendPayment {
                        ticker: asset.ticker.clone(),
                        name: asset.name.clone(),
                        date: p.date,
                        amount: p.amount,
                    });
                }
            }
            Err(err) => {
                tracing::warn!(symbol = %asset.symbol, error = %err, "dividend fetch failed; skipping");
            }
        }
    }
    out.sort_by(|a, b| b.date.cmp(&a.date));
    out
}

pub async fn collect_earnings(
    provider: &dyn MarketDataProvider,
    watchlist: &[Asset],
) -> Vec<EarningsComparison> {
    let mut out = Vec::new();
    for asset in watchlist {
        if asset.kind == AssetKind::Crypto {
            continue;
        }
        match provider.fetch_financials(&asset.symbol).await {
            Ok(resp) => out.push(fundamentals::compare_quarters(asset, &resp)),
            Err(err) => {
                tracing::warn!(symbol = %asset.symbol, error = %err, "financials fetch failed; skipping");
            }
        }
    }
    out
}

/// Lazy per-asset fundamentals; all defaults for crypto or on any failure.
pub async fn fundamentals_for_asset(
    provider: &dyn MarketDataProvider,
    asset: &Asset,
) -> FundamentalSnapshot {
    if asset.kind == AssetKind::Crypto {
        return FundamentalSnapshot::unavailable();
    }
    match provider.fetch_fundamentals(&asset.symbol).await {
        Ok(wire) => fundamentals::normalize(wire),
        Err(err) => {
            tracing::warn!(symbol = %asset.symbol, error = %err, "fundamentals fetch failed; defaulting");
            FundamentalSnapshot::unavailable()
        }
    }
}

/// Most-recent-first headlines, capped at NEWS_LIMIT; empty on any failure.
pub async fn news_for_asset(provider: &dyn MarketDataProvider, asset: &Asset) -> Vec<NewsItem> {
    let resp = match provider.fetch_news(&asset.symbol).await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(symbol = %asset.symbol, error = %err, "news fetch failed; no headlines");
            return Vec::new();
        }
    };

    resp.items
        .into_iter()
        .filter_map(|item| {
            let title = item.title.filter(|t| !t.trim().is_empty())?;
            // Trim provider timestamps to minute precision for display.
            let published: String = item
                .published_at
                .unwrap_or_default()
                .chars()
                .take(16)
                .collect();
            Some(NewsItem::new(
                &title,
                item.link.as_deref().unwrap_or("#"),
                item.source.as_deref().unwrap_or("N/D"),
                &published,
            ))
        })
        .take(NEWS_LIMIT)
        .collect()
}

fn closed_points(candles: &[Candle]) -> Vec<PricePoint> {
    candles
        .iter()
        .filter_map(|c| {
            c.close.map(|price| PricePoint {
                date: c.date,
                price: indicators::round2(price),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{
        DividendsResponse, FinancialsResponse, FundamentalsResponse, HistoryResponse, NewsResponse,
    };
    use chrono::NaiveDate;
    use std::collections::HashMap;

    struct FixtureProvider {
        histories: HashMap<(String, &'static str), HistoryResponse>,
        dividends: HashMap<String, DividendsResponse>,
        news: HashMap<String, NewsResponse>,
    }

    impl FixtureProvider {
        fn new() -> Self {
            Self {
                histories: HashMap::new(),
                dividends: HashMap::new(),
                news: HashMap::new(),
            }
        }

        fn with_history(mut self, symbol: &str, range: HistoryRange, closes: &[f64]) -> Self {
            let candles = candles_from_closes(closes);
            self.histories.insert(
                (symbol.to_string(), range.as_query()),
                HistoryResponse {
                    symbol: symbol.to_string(),
                    candles,
                },
            );
            self
        }
    }

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                date: NaiveDate::from_ymd_opt(2026, 7, 1 + i as u32).unwrap(),
                open: Some(close - 0.1),
                high: Some(close + 0.3),
                low: Some(close - 0.4),
                close: Some(*close),
                volume: Some(1000.0),
            })
            .collect()
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for FixtureProvider {
        fn provider_name(&self) -> &'static str {
            "fixture"
        }

        async fn fetch_history(
            &self,
            symbol: &str,
            range: HistoryRange,
        ) -> Result<HistoryResponse> {
            self.histories
                .get(&(symbol.to_string(), range.as_query()))
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no fixture history for {symbol}"))
        }

        async fn fetch_fundamentals(&self, _symbol: &str) -> Result<FundamentalsResponse> {
            anyhow::bail!("no fixture fundamentals")
        }

        async fn fetch_dividends(&self, symbol: &str) -> Result<DividendsResponse> {
            self.dividends
                .get(symbol)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no fixture dividends for {symbol}"))
        }

        async fn fetch_news(&self, symbol: &str) -> Result<NewsResponse> {
            self.news
                .get(symbol)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no fixture news for {symbol}"))
        }

        async fn fetch_financials(&self, _symbol: &str) -> Result<FinancialsResponse> {
            anyhow::bail!("no fixture financials")
        }
    }

    fn watchlist() -> Vec<Asset> {
        vec![
            Asset::new("ALFA3.SA", "Alfa", "Financeiro"),
            Asset::new("BETA3.SA", "Beta", "Energia"),
            Asset::new("GAMA-USD", "Gama", "Criptomoeda"),
        ]
    }

    fn fixture() -> FixtureProvider {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        FixtureProvider::new()
            .with_history("ALFA3.SA", HistoryRange::FiveDays, &[10.0, 10.5, 11.0, 10.8, 11.2])
            .with_history("ALFA3.SA", HistoryRange::OneMonth, &rising)
            .with_history(
                "ALFA3.SA",
                HistoryRange::TenDays,
                &[9.0, 9.2, 9.4, 9.6, 9.8, 9.9, 10.0, 10.2, 10.4, 10.6],
            )
            .with_history("BETA3.SA", HistoryRange::FiveDays, &[50.0, 49.0, 47.5, 48.0, 46.0])
            .with_history("BETA3.SA", HistoryRange::OneMonth, &[50.0, 49.0])
            .with_history("BETA3.SA", HistoryRange::TenDays, &[50.0, 49.0])
            .with_history("GAMA-USD", HistoryRange::FiveDays, &[60000.0, 61000.0])
            .with_history("GAMA-USD", HistoryRange::OneMonth, &[60000.0, 61000.0])
            .with_history("GAMA-USD", HistoryRange::TenDays, &[60000.0, 61000.0])
    }

    #[tokio::test]
    async fn snapshot_matches_hand_computed_reference() {
        let quotes = collect_quotes(&fixture(), &watchlist()).await;
        assert_eq!(quotes.len(), 3);

        // Sorted by variation descending: ALFA +12.00, GAMA +1.67, BETA -8.00.
        assert_eq!(quotes[0].asset.ticker, "ALFA3");
        assert_eq!(quotes[1].asset.ticker, "GAMA");
        assert_eq!(quotes[2].asset.ticker, "BETA3");

        let alfa = &quotes[0];
        assert_eq!(alfa.variation, 12.0);
        assert_eq!(alfa.volatility, 3.20);
        assert_eq!(alfa.high, 11.5);
        assert_eq!(alfa.low, 9.6);
        assert_eq!(alfa.drawdown, -16.52);
        assert_eq!(alfa.prior_variation, 10.0);
        assert_eq!(alfa.mean_volume, 1000.0);
        // Monotonically rising 20-point monthly series: overbought.
        assert!(alfa.rsi >= 70.0);

        let beta = &quotes[2];
        assert_eq!(beta.variation, -8.0);
        assert_eq!(beta.volatility, 2.25);
        // Monthly series too short for RSI: neutral default.
        assert_eq!(beta.rsi, 50.0);

        assert_eq!(quotes[1].variation, 1.67);
    }

    #[tokio::test]
    async fn failed_asset_is_excluded_and_run_continues() {
        let mut list = watchlist();
        list.push(Asset::new("MISS3.SA", "Missing", "Setor"));
        let quotes = collect_quotes(&fixture(), &list).await;
        assert_eq!(quotes.len(), 3);
        assert!(quotes.iter().all(|q| q.asset.ticker != "MISS3"));
    }

    #[tokio::test]
    async fn correlations_skip_failures() {
        // Fixture has no ^BVSP / USDBRL=X, only BTC-USD.
        let provider = fixture()
            .with_history("BTC-USD", HistoryRange::FiveDays, &[60000.0, 61000.0, 62000.0]);
        let points = collect_correlations(&provider).await;
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, "BTC");
        assert_eq!(points[0].level, 62000.0);
    }

    #[tokio::test]
    async fn fundamentals_default_on_failure_and_for_crypto() {
        let provider = fixture();
        let assets = watchlist();
        let equity = fundamentals_for_asset(&provider, &assets[0]).await;
        assert_eq!(equity.pe, 0.0);
        assert_eq!(equity.recommendation, "N/D");

        let crypto = fundamentals_for_asset(&provider, &assets[2]).await;
        assert_eq!(crypto.market_cap, 0.0);
    }

    #[tokio::test]
    async fn news_normalization_caps_and_defaults() {
        let mut provider = fixture();
        provider.news.insert(
            "ALFA3.SA".to_string(),
            NewsResponse {
                items: (0..7)
                    .map(|i| crate::ingest::types::NewsWire {
                        title: Some(format!("Manchete {i}")),
                        link: None,
                        source: None,
                        published_at: Some("2026-07-30T09:15:00Z".to_string()),
                    })
                    .collect(),
            },
        );
        let assets = watchlist();
        let news = news_for_asset(&provider, &assets[0]).await;
        assert_eq!(news.len(), NEWS_LIMIT);
        assert_eq!(news[0].link, "#");
        assert_eq!(news[0].source, "N/D");
        // Provider timestamps are trimmed to minute precision.
        assert_eq!(news[0].published_at, "2026-07-30T09:15");
        let missing = news_for_asset(&provider, &assets[1]).await;
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn dividends_take_three_most_recent_per_asset() {
        let mut provider = fixture();
        provider.dividends.insert(
            "ALFA3.SA".to_string(),
            DividendsResponse {
                payments: (1..=5)
                    .map(|d| crate::ingest::types::DividendWire {
                        date: NaiveDate::from_ymd_opt(2026, 6, d).unwrap(),
                        amount: 0.10 * d as f64,
                    })
                    .collect(),
            },
        );
        let list = watchlist();
        let payments = collect_dividends(&provider, &list).await;
        assert_eq!(payments.len(), DIVIDENDS_PER_ASSET);
        // Most recent first.
        assert_eq!(payments[0].date, NaiveDate::from_ymd_opt(2026, 6, 5).unwrap());
        assert_eq!(payments[2].date, NaiveDate::from_ymd_opt(2026, 6, 3).unwrap());
    }
}
