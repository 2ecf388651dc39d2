use crate::config::Settings;
use crate::deliver::{self, DeliveryError, DeliveryResult};
use crate::domain::quote::QuoteSnapshot;
use crate::domain::report::Report;
use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

const DEFAULT_RELAY: &str = "smtp.gmail.com";
const SMTP_TIMEOUT_SECS: u64 = 30;
const ANALYSIS_PREVIEW_CHARS: usize = 800;

/// Channel B: one multipart e-mail with an HTML summary body and the
/// rendered PDF attached, delivered over an authenticated implicit-TLS
/// relay. All-or-nothing per invocation.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (sender, password, recipient) = settings.require_smtp()?;
        let relay = std::env::var("SMTP_RELAY").unwrap_or_else(|_| DEFAULT_RELAY.to_string());
        Self::new(sender, password, recipient, &relay)
    }

    pub fn new(
        sender: &str,
        app_password: &str,
        recipient: &str,
        relay: &str,
    ) -> anyhow::Result<Self> {
        let from: Mailbox = sender
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid sender address: {e}"))?;
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid recipient address: {e}"))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(relay)
            .context("failed to build smtp transport")?
            .credentials(Credentials::new(sender.to_string(), app_password.to_string()))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build();

        Ok(Self { transport, from, to })
    }

    pub async fn send_report(
        &self,
        quotes: &[QuoteSnapshot],
        report: &Report,
        pdf: &[u8],
    ) -> DeliveryResult {
        self.try_send(quotes, report, pdf)
            .await
            .map_err(|err| DeliveryError {
                channel: "email",
                detail: format!("{err:#}"),
            })
    }

    async fn try_send(
        &self,
        quotes: &[QuoteSnapshot],
        report: &Report,
        pdf: &[u8],
    ) -> anyhow::Result<()> {
        let filename = format!("relatorio_b3_{}.pdf", report.generated_at.format("%Y%m%d"));
        let pdf_type =
            ContentType::parse("application/pdf").context("invalid attachment content type")?;
        let attachment = Attachment::new(filename).body(pdf.to_vec(), pdf_type);

        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!(
                "📊 Carteira Inteligente — Relatório Semanal — {}",
                report.generated_label()
            ))
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(build_html(quotes, report)))
                    .singlepart(attachment),
            )
            .context("failed to build email")?;

        self.transport
            .send(email)
            .await
            .context("smtp send failed")?;
        Ok(())
    }
}

fn build_html(quotes: &[QuoteSnapshot], report: &Report) -> String {
    let mut html = vec![format!(
        "<h2>📊 Carteira Inteligente — {}</h2><hr>",
        report.generated_label()
    )];
    for quote in quotes {
        let (marker, color) = if quote.variation > 0.0 {
            ("🟢", "#22c55e")
        } else {
            ("🔴", "#ef4444")
        };
        html.push(format!(
            "<p>{marker} <b>{}</b>: <span style=\"color:{color}\">{:+.2}%</span></p>",
            quote.asset.ticker, quote.variation
        ));
    }
    html.push(format!(
        "<hr><h3>Análise</h3><p>{}</p>",
        deliver::preview(&report.analysis, ANALYSIS_PREVIEW_CHARS)
    ));
    html.push(
        "<p style='color:#666;font-size:12px'>Relatório informativo. Não é consultoria financeira.</p>"
            .to_string(),
    );
    html.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::Asset;
    use chrono::{TimeZone, Utc};

    fn report() -> Report {
        Report {
            analysis: "Semana de recuperação.".to_string(),
            recommendations: "Manter posição.".to_string(),
            generated_at: Utc.with_ymd_and_hms(2026, 7, 31, 18, 0, 0).unwrap(),
        }
    }

    fn quotes() -> Vec<QuoteSnapshot> {
        vec![QuoteSnapshot {
            asset: Asset::new("CSAN3.SA", "Cosan", "Energia & Logística"),
            open: 12.0,
            close: 11.6,
            high: 12.2,
            low: 11.4,
            variation: -3.33,
            prior_variation: 0.2,
            mean_volume: 900_000.0,
            volatility: 1.9,
            drawdown: -6.56,
            rsi: 41.0,
            history: Vec::new(),
        }]
    }

    #[test]
    fn html_colors_negative_variation() {
        let html = build_html(&quotes(), &report());
        assert!(html.contains("CSAN3"));
        assert!(html.contains("#ef4444"));
        assert!(html.contains("-3.33%"));
        assert!(html.contains("Não é consultoria financeira"));
    }

    #[test]
    fn rejects_invalid_addresses() {
        assert!(EmailNotifier::new("not-an-address", "pw", "b@c.dev", "127.0.0.1").is_err());
        assert!(EmailNotifier::new("a@b.dev", "pw", "not-an-address", "127.0.0.1").is_err());
    }

    #[tokio::test]
    async fn network_failure_returns_error_value() {
        // 127.0.0.1:465 has no SMTP listener in the test environment; the
        // failure must come back as a value with the channel tag.
        let notifier = EmailNotifier::new("a@b.dev", "pw", "c@d.dev", "127.0.0.1").unwrap();
        let err = notifier
            .send_report(&quotes(), &report(), b"%PDF-stub")
            .await
            .unwrap_err();
        assert_eq!(err.channel, "email");
        assert!(!err.detail.is_empty());
    }
}
