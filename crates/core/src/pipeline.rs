//! One report-generation run. The `RunContext` replaces ad-hoc session
//! state: it owns the collected snapshot, the narrative report, the
//! rendered artifact and the per-asset sentiment cache, and lives exactly
//! as long as the run.

use crate::domain::asset::Asset;
use crate::domain::fundamentals::{DividendPayment, EarningsComparison};
use crate::domain::news::SentimentResult;
use crate::domain::quote::{CorrelationPoint, QuoteSnapshot};
use crate::domain::report::Report;
use crate::indicators::round1;
use crate::ingest::collect;
use crate::ingest::provider::MarketDataProvider;
use crate::llm::ChatClient;
use crate::narrative::ReportOrchestrator;
use crate::render;
use crate::sentiment;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Market data only; collectable without an LLM credential.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub quotes: Vec<QuoteSnapshot>,
    pub correlations: Vec<CorrelationPoint>,
    pub dividends: Vec<DividendPayment>,
    pub earnings: Vec<EarningsComparison>,
}

pub struct RunContext {
    pub generated_at: DateTime<Utc>,
    pub watchlist: Vec<Asset>,
    pub quotes: Vec<QuoteSnapshot>,
    pub correlations: Vec<CorrelationPoint>,
    pub dividends: Vec<DividendPayment>,
    pub earnings: Vec<EarningsComparison>,
    pub earnings_assessment: String,
    pub report: Report,
    pub pdf: Vec<u8>,
    sentiments: HashMap<String, SentimentResult>,
}

impl RunContext {
    pub fn asset(&self, ticker: &str) -> Option<&Asset> {
        self.quotes
            .iter()
            .map(|q| &q.asset)
            .find(|a| a.ticker == ticker)
    }

    /// Lazy, memoized sentiment for one inspected asset. The scorer runs at
    /// most once per (asset, run); later calls are served from the cache.
    /// `None` only for tickers outside the collected snapshot.
    pub async fn sentiment_for(
        &mut self,
        provider: &dyn MarketDataProvider,
        llm: Option<&dyn ChatClient>,
        ticker: &str,
    ) -> Option<SentimentResult> {
        let asset = self.asset(ticker)?.clone();
        if let Some(cached) = self.sentiments.get(ticker) {
            return Some(cached.clone());
        }
        let news = collect::news_for_asset(provider, &asset).await;
        let scored = sentiment::score_headlines(llm, &asset, news).await;
        self.sentiments.insert(ticker.to_string(), scored.clone());
        Some(scored)
    }

    /// Arithmetic mean of the asset scores computed so far in the run:
    /// inspected assets only, not the whole watch-list.
    pub fn portfolio_score(&self) -> Option<f64> {
        if self.sentiments.is_empty() {
            return None;
        }
        let sum: f64 = self.sentiments.values().map(|s| s.score).sum();
        Some(round1(sum / self.sentiments.len() as f64))
    }

    pub fn scored_assets(&self) -> usize {
        self.sentiments.len()
    }
}

pub async fn collect_market_data(
    provider: &dyn MarketDataProvider,
    watchlist: &[Asset],
) -> anyhow::Result<MarketData> {
    let quotes = collect::collect_quotes(provider, watchlist).await;
    anyhow::ensure!(
        !quotes.is_empty(),
        "no quotes collected for the configured watch-list"
    );

    let correlations = collect::collect_correlations(provider).await;
    let dividends = collect::collect_dividends(provider, watchlist).await;
    let earnings = collect::collect_earnings(provider, watchlist).await;

    Ok(MarketData {
        quotes,
        correlations,
        dividends,
        earnings,
    })
}

/// Full run: market data, two-stage narrative (with the enforced delay),
/// earnings assessment, rendered PDF. Narrative failure aborts the run;
/// already-collected quote data stays valid at the caller.
pub async fn run_pipeline(
    provider: &dyn MarketDataProvider,
    llm: &dyn ChatClient,
    watchlist: &[Asset],
) -> anyhow::Result<RunContext> {
    let data = collect_market_data(provider, watchlist).await?;
    tracing::info!(
        assets = data.quotes.len(),
        correlations = data.correlations.len(),
        "market data collected"
    );
    finish_run(llm, watchlist, data).await
}

/// Narrative, earnings assessment and rendering over already-collected
/// market data. Split out so callers can keep the collected snapshot when
/// generation fails.
pub async fn finish_run(
    llm: &dyn ChatClient,
    watchlist: &[Asset],
    data: MarketData,
) -> anyhow::Result<RunContext> {
    let orchestrator = ReportOrchestrator::new(llm);
    let report = orchestrator
        .generate(&data.quotes, &data.correlations)
        .await
        .context("report generation failed")?;
    tracing::info!(model = llm.model(), "narrative generated");

    let earnings_assessment = orchestrator.assess_earnings(&data.earnings).await;

    let pdf = render::render_pdf(&data.quotes, &report, &data.correlations)
        .context("report rendering failed")?;
    tracing::info!(bytes = pdf.len(), "report rendered");

    Ok(RunContext {
        generated_at: report.generated_at,
        watchlist: watchlist.to_vec(),
        quotes: data.quotes,
        correlations: data.correlations,
        dividends: data.dividends,
        earnings: data.earnings,
        earnings_assessment,
        report,
        pdf,
        sentiments: HashMap::new(),
    })
}
