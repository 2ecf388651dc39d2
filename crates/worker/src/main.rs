use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carteira_core::deliver::email::EmailNotifier;
use carteira_core::deliver::telegram::TelegramNotifier;
use carteira_core::deliver::DeliveryResult;

#[derive(Debug, Parser)]
#[command(name = "carteira_worker")]
struct Args {
    /// Where to write the rendered PDF. Defaults to relatorio_b3_<date>.pdf
    /// in the working directory.
    #[arg(long)]
    output: Option<std::path::PathBuf>,

    /// Collect market data and log the snapshot without generating the
    /// narrative report (no LLM credential needed).
    #[arg(long)]
    collect_only: bool,

    /// Push the report through the Telegram channel after rendering.
    #[arg(long)]
    send_telegram: bool,

    /// Push the report through the e-mail channel after rendering.
    #[arg(long)]
    send_email: bool,
}

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

    let args = Args::parse();

    let watchlist = carteira_core::domain::asset::watchlist_from_env();
    let provider = carteira_core::ingest::provider::HttpJsonMarketData::from_settings(&settings)?;

    if args.collect_only {
        let data = carteira_core::pipeline::collect_market_data(&provider, &watchlist).await?;
        for quote in &data.quotes {
            tracing::info!(
                ticker = %quote.asset.ticker,
                close = quote.close,
                variation = quote.variation,
                volatility = quote.volatility,
                rsi = quote.rsi,
                "quote collected"
            );
        }
        tracing::info!(
            assets = data.quotes.len(),
            correlations = data.correlations.len(),
            earnings = data.earnings.len(),
            collect_only = true,
            "collection finished"
        );
        return Ok(());
    }

    let llm = carteira_core::llm::groq::GroqClient::from_settings(&settings)?;

    let ctx = match carteira_core::pipeline::run_pipeline(&provider, &llm, &watchlist).await {
        Ok(ctx) => ctx,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %format!("{err:#}"), "report run failed");
            return Err(err);
        }
    };

    let output = args.output.unwrap_or_else(|| {
        std::path::PathBuf::from(format!(
            "relatorio_b3_{}.pdf",
            ctx.generated_at.format("%Y%m%d")
        ))
    });
    std::fs::write(&output, &ctx.pdf)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), bytes = ctx.pdf.len(), "report written");

    if args.send_telegram {
        let outcome = match TelegramNotifier::from_settings(&settings) {
            Ok(notifier) => notifier.send_report(&ctx.quotes, &ctx.report, &ctx.pdf).await,
            Err(err) => Err(carteira_core::deliver::DeliveryError {
                channel: "telegram",
                detail: format!("{err:#}"),
            }),
        };
        log_delivery("telegram", outcome);
    }

    if args.send_email {
        let outcome = match EmailNotifier::from_settings(&settings) {
            Ok(notifier) => notifier.send_report(&ctx.quotes, &ctx.report, &ctx.pdf).await,
            Err(err) => Err(carteira_core::deliver::DeliveryError {
                channel: "email",
                detail: format!("{err:#}"),
            }),
        };
        log_delivery("email", outcome);
    }

    Ok(())
}

/// One channel failing is reported and never fails the process or the
/// other channel.
fn log_delivery(channel: &'static str, outcome: DeliveryResult) {
    match outcome {
        Ok(()) => tracing::info!(channel, "delivery succeeded"),
        Err(err) => tracing::error!(channel, error = %err, "delivery failed"),
    }
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
