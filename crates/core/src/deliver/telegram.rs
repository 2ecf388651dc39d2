use crate::config::Settings;
use crate::deliver::{self, DeliveryError, DeliveryResult};
use crate::domain::quote::QuoteSnapshot;
use crate::domain::report::Report;
use anyhow::Context;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const MESSAGE_TIMEOUT_SECS: u64 = 15;
const DOCUMENT_TIMEOUT_SECS: u64 = 30;
const ANALYSIS_PREVIEW_CHARS: usize = 500;

/// Channel A: a short formatted summary message followed by the rendered
/// PDF as a document upload. All-or-nothing per invocation.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let (token, chat_id) = settings.require_telegram()?;
        Self::new(token, chat_id)
    }

    pub fn new(token: &str, chat_id: &str) -> anyhow::Result<Self> {
        let base_url =
            std::env::var("TELEGRAM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build telegram http client")?;
        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
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
                channel: "telegram",
                detail: format!("{err:#}"),
            })
    }

    async fn try_send(
        &self,
        quotes: &[QuoteSnapshot],
        report: &Report,
        pdf: &[u8],
    ) -> anyhow::Result<()> {
        let url = self.method_url("sendMessage");
        let res = self
            .http
            .post(url)
            .timeout(Duration::from_secs(MESSAGE_TIMEOUT_SECS))
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": build_message(quotes, report),
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .context("sendMessage request failed")?;
        ensure_telegram_ok(res).await.context("sendMessage rejected")?;

        let filename = format!("relatorio_b3_{}.pdf", report.generated_at.format("%Y%m%d"));
        let part = reqwest::multipart::Part::bytes(pdf.to_vec())
            .file_name(filename)
            .mime_str("application/pdf")
            .context("failed to build document part")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", "Relatório completo em PDF")
            .part("document", part);

        let url = self.method_url("sendDocument");
        let res = self
            .http
            .post(url)
            .timeout(Duration::from_secs(DOCUMENT_TIMEOUT_SECS))
            .multipart(form)
            .send()
            .await
            .context("sendDocument request failed")?;
        ensure_telegram_ok(res).await.context("sendDocument rejected")?;

        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url.trim_end_matches('/'),
            self.token
        )
    }
}

async fn ensure_telegram_ok(res: reqwest::Response) -> anyhow::Result<()> {
    let status = res.status();
    if status.is_success() {
        return Ok(());
    }
    let body = res.text().await.unwrap_or_default();
    anyhow::bail!("telegram HTTP {status}: {body}")
}

fn build_message(quotes: &[QuoteSnapshot], report: &Report) -> String {
    let mut lines = vec![format!("📈 *Analista B3 — {}*\n", report.generated_label())];
    lines.extend(deliver::summary_lines(quotes));
    lines.push(format!(
        "\n📊 *Análise:*\n{}",
        deliver::preview(&report.analysis, ANALYSIS_PREVIEW_CHARS)
    ));
    lines.join("\n")
}
