use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carteira_core::domain::asset::Asset;
use carteira_core::domain::fundamentals::{DividendPayment, EarningsComparison, FundamentalSnapshot};
use carteira_core::domain::news::SentimentResult;
use carteira_core::domain::quote::{CorrelationPoint, QuoteSnapshot};
use carteira_core::ingest::provider::HttpJsonMarketData;
use carteira_core::llm::groq::GroqClient;
use carteira_core::llm::ChatClient;
use carteira_core::pipeline::{self, MarketData, RunContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = carteira_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let watchlist = carteira_core::domain::asset::watchlist_from_env();
    let provider = HttpJsonMarketData::from_settings(&settings)?;

    let llm = match GroqClient::from_settings(&settings) {
        Ok(client) => Some(client),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "LLM credential missing; starting API in degraded mode");
            None
        }
    };

    // Zero collected assets is the one startup precondition that has to
    // fail loudly: there is nothing to serve.
    let data = pipeline::collect_market_data(&provider, &watchlist).await?;

    let run = match &llm {
        Some(client) => match pipeline::finish_run(client, &watchlist, data.clone()).await {
            Ok(ctx) => RunState::Full(Box::new(ctx)),
            Err(err) => {
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(
                    error = %format!("{err:#}"),
                    "report generation failed; starting API in degraded mode"
                );
                RunState::Degraded(data)
            }
        },
        None => RunState::Degraded(data),
    };

    let state = AppState {
        inner: Arc::new(ApiInner {
            provider,
            llm,
            run: Mutex::new(run),
        }),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/snapshot", get(get_snapshot))
        .route("/report", get(get_report))
        .route("/report.pdf", get(get_report_pdf))
        .route("/fundamentals/:ticker", get(get_fundamentals))
        .route("/sentiment", get(get_portfolio_sentiment))
        .route("/sentiment/:ticker", get(get_sentiment))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    provider: HttpJsonMarketData,
    llm: Option<GroqClient>,
    run: Mutex<RunState>,
}

enum RunState {
    Full(Box<RunContext>),
    Degraded(MarketData),
}

#[derive(Debug, Serialize)]
struct SnapshotView {
    generated_at: Option<DateTime<Utc>>,
    degraded: bool,
    quotes: Vec<QuoteSnapshot>,
    correlations: Vec<CorrelationPoint>,
    dividends: Vec<DividendPayment>,
    earnings: Vec<EarningsComparison>,
}

async fn get_snapshot(State(state): State<AppState>) -> Json<SnapshotView> {
    let run = state.inner.run.lock().await;
    let view = match &*run {
        RunState::Full(ctx) => SnapshotView {
            generated_at: Some(ctx.generated_at),
            degraded: false,
            quotes: ctx.quotes.clone(),
            correlations: ctx.correlations.clone(),
            dividends: ctx.dividends.clone(),
            earnings: ctx.earnings.clone(),
        },
        RunState::Degraded(data) => SnapshotView {
            generated_at: None,
            degraded: true,
            quotes: data.quotes.clone(),
            correlations: data.correlations.clone(),
            dividends: data.dividends.clone(),
            earnings: data.earnings.clone(),
        },
    };
    Json(view)
}

#[derive(Debug, Serialize)]
struct ReportView {
    analysis: String,
    recommendations: String,
    earnings_assessment: String,
    generated_at: DateTime<Utc>,
}

async fn get_report(State(state): State<AppState>) -> Result<Json<ReportView>, StatusCode> {
    let run = state.inner.run.lock().await;
    match &*run {
        RunState::Full(ctx) => Ok(Json(ReportView {
            analysis: ctx.report.analysis.clone(),
            recommendations: ctx.report.recommendations.clone(),
            earnings_assessment: ctx.earnings_assessment.clone(),
            generated_at: ctx.report.generated_at,
        })),
        RunState::Degraded(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn get_report_pdf(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let run = state.inner.run.lock().await;
    match &*run {
        RunState::Full(ctx) => Ok((
            [(header::CONTENT_TYPE, "application/pdf")],
            ctx.pdf.clone(),
        )),
        RunState::Degraded(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

/// Lazy per-asset fundamentals. Available even in degraded mode: the
/// lookup is independent of the narrative report.
async fn get_fundamentals(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<FundamentalSnapshot>, StatusCode> {
    let asset: Asset = {
        let run = state.inner.run.lock().await;
        let quotes = match &*run {
            RunState::Full(ctx) => &ctx.quotes,
            RunState::Degraded(data) => &data.quotes,
        };
        quotes
            .iter()
            .map(|q| q.asset.clone())
            .find(|a| a.ticker == ticker)
            .ok_or(StatusCode::NOT_FOUND)?
    };

    let snapshot =
        carteira_core::ingest::collect::fundamentals_for_asset(&state.inner.provider, &asset).await;
    Ok(Json(snapshot))
}

async fn get_sentiment(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> Result<Json<SentimentResult>, StatusCode> {
    let mut run = state.inner.run.lock().await;
    match &mut *run {
        RunState::Full(ctx) => {
            let llm = state.inner.llm.as_ref().map(|c| c as &dyn ChatClient);
            match ctx.sentiment_for(&state.inner.provider, llm, &ticker).await {
                Some(result) => Ok(Json(result)),
                None => Err(StatusCode::NOT_FOUND),
            }
        }
        RunState::Degraded(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

#[derive(Debug, Serialize)]
struct PortfolioSentimentView {
    score: f64,
    assets: usize,
}

async fn get_portfolio_sentiment(
    State(state): State<AppState>,
) -> Result<Json<PortfolioSentimentView>, StatusCode> {
    let run = state.inner.run.lock().await;
    match &*run {
        RunState::Full(ctx) => ctx
            .portfolio_score()
            .map(|score| {
                Json(PortfolioSentimentView {
                    score,
                    assets: ctx.scored_assets(),
                })
            })
            .ok_or(StatusCode::NOT_FOUND),
        RunState::Degraded(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &carteira_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
