//! Two-stage narrative generation. The second call builds on the first
//! call's text, and a fixed delay separates them to respect the upstream
//! rate limit. This is the one stage allowed to abort report generation:
//! without narrative text there is nothing to render.

use crate::domain::fundamentals::EarningsComparison;
use crate::domain::quote::{CorrelationPoint, QuoteSnapshot};
use crate::domain::report::Report;
use crate::llm::{ChatClient, ChatRequest};
use anyhow::Context;
use chrono::Utc;
use std::time::Duration;

/// Mandatory spacing between the two narrative calls. Deliberate throttle,
/// not a bug.
pub const INTER_CALL_DELAY: Duration = Duration::from_secs(20);

const NARRATIVE_TEMPERATURE: f64 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 700;
const RECOMMENDATION_MAX_TOKENS: u32 = 800;
const ASSESSMENT_MAX_TOKENS: u32 = 600;

pub struct ReportOrchestrator<'a> {
    llm: &'a dyn ChatClient,
    inter_call_delay: Duration,
}

impl<'a> ReportOrchestrator<'a> {
    pub fn new(llm: &'a dyn ChatClient) -> Self {
        Self {
            llm,
            inter_call_delay: INTER_CALL_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_call_delay = delay;
        self
    }

    /// Market analysis, enforced delay, then recommendations seeded with
    /// the analysis text. Either call failing fails the whole stage.
    pub async fn generate(
        &self,
        quotes: &[QuoteSnapshot],
        correlations: &[CorrelationPoint],
    ) -> anyhow::Result<Report> {
        let request = ChatRequest::user(analysis_prompt(quotes, correlations)?)
            .with_temperature(NARRATIVE_TEMPERATURE)
            .with_max_tokens(ANALYSIS_MAX_TOKENS);
        let analysis = self
            .llm
            .complete(request)
            .await
            .context("market analysis generation failed")?;

        tokio::time::sleep(self.inter_call_delay).await;

        let request = ChatRequest::user(recommendations_prompt(&analysis))
            .with_temperature(NARRATIVE_TEMPERATURE)
            .with_max_tokens(RECOMMENDATION_MAX_TOKENS);
        let recommendations = self
            .llm
            .complete(request)
            .await
            .context("recommendations generation failed")?;

        Ok(Report {
            analysis,
            recommendations,
            generated_at: Utc::now(),
        })
    }

    /// Independent short/medium/long-term read of the quarterly results.
    /// Empty input or any failure yields an empty string, never an error.
    pub async fn assess_earnings(&self, comparisons: &[EarningsComparison]) -> String {
        if comparisons.is_empty() {
            return String::new();
        }

        let request = ChatRequest::user(assessment_prompt(comparisons))
            .with_temperature(NARRATIVE_TEMPERATURE)
            .with_max_tokens(ASSESSMENT_MAX_TOKENS);
        match self.llm.complete(request).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "earnings assessment failed; omitting section");
                String::new()
            }
        }
    }
}

fn analysis_prompt(
    quotes: &[QuoteSnapshot],
    correlations: &[CorrelationPoint],
) -> anyhow::Result<String> {
    let quotes_json = serde_json::to_string(quotes).context("failed to serialize quotes")?;
    let correlations_json =
        serde_json::to_string(correlations).context("failed to serialize correlations")?;

    Ok(format!(
        "Carteira: {quotes_json}\n\nCorrelações (IBOV/Dólar/BTC): {correlations_json}\n\n\
Escreva análise com: 1. Panorama geral 2. Maiores altas 3. Maiores baixas \
4. Impacto do dólar e BTC na carteira 5. Perspectivas. \
Máximo 400 palavras, em Markdown."
    ))
}

fn recommendations_prompt(analysis: &str) -> String {
    format!(
        "Análise: {analysis}\n\n\
Crie recomendações: 1. Disclaimer 2. Resumo executivo 3. Perfil Conservador \
4. Perfil Moderado 5. Perfil Arrojado 6. Top 3 ativos \
7. Cenário otimista e pessimista. Máximo 450 palavras, em Markdown."
    )
}

fn assessment_prompt(comparisons: &[EarningsComparison]) -> String {
    let lines: Vec<String> = comparisons
        .iter()
        .map(|c| match (c.revenue_delta, c.net_income_delta) {
            (Some(rev), Some(ni)) => format!(
                "{} ({}): receita {rev:+.1}% vs trim. anterior, lucro {ni:+.1}%",
                c.ticker, c.name
            ),
            _ => format!("{} ({}): dados insuficientes", c.ticker, c.name),
        })
        .collect();

    format!(
        "Analise os resultados trimestrais abaixo e escreva uma avaliação concisa \
em português, com no máximo 250 palavras, estruturada em 3 parágrafos:\n\n\
1. **Curto Prazo** — O que esses números significam para as ações nas próximas semanas?\n\
2. **Médio Prazo** — Tendência para os próximos 2-4 trimestres?\n\
3. **Longo Prazo** — Os fundamentos suportam crescimento sustentável?\n\n\
Resultados:\n{}\n\n\
Seja direto e use linguagem acessível para investidores pessoa física.",
        lines.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::Asset;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct RecordingClient {
        prompts: Mutex<Vec<String>>,
        called_at: Mutex<Vec<Instant>>,
    }

    impl RecordingClient {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                called_at: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatClient for RecordingClient {
        fn model(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: ChatRequest) -> anyhow::Result<String> {
            self.called_at.lock().unwrap().push(Instant::now());
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt);
            Ok(format!("resposta {}", prompts.len()))
        }
    }

    struct FailingClient;

    #[async_trait::async_trait]
    impl ChatClient for FailingClient {
        fn model(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: ChatRequest) -> anyhow::Result<String> {
            anyhow::bail!("retries exhausted")
        }
    }

    fn quotes() -> Vec<QuoteSnapshot> {
        vec![QuoteSnapshot {
            asset: Asset::new("TAEE3.SA", "Taesa", "Energia Elétrica"),
            open: 34.0,
            close: 35.0,
            high: 35.4,
            low: 33.8,
            variation: 2.94,
            prior_variation: 1.1,
            mean_volume: 100_000.0,
            volatility: 0.8,
            drawdown: -4.52,
            rsi: 55.0,
            history: Vec::new(),
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn enforces_inter_call_delay() {
        let client = RecordingClient::new();
        let orchestrator = ReportOrchestrator::new(&client);
        let report = orchestrator.generate(&quotes(), &[]).await.unwrap();

        let times = client.called_at.lock().unwrap();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] >= INTER_CALL_DELAY);

        assert_eq!(report.analysis, "resposta 1");
        assert_eq!(report.recommendations, "resposta 2");
    }

    #[tokio::test(start_paused = true)]
    async fn second_prompt_builds_on_first_output() {
        let client = RecordingClient::new();
        let orchestrator = ReportOrchestrator::new(&client);
        orchestrator.generate(&quotes(), &[]).await.unwrap();

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("TAEE3"));
        assert!(prompts[1].contains("resposta 1"));
        assert!(prompts[1].contains("Perfil Conservador"));
    }

    #[tokio::test(start_paused = true)]
    async fn generation_failure_surfaces_explicitly() {
        let orchestrator = ReportOrchestrator::new(&FailingClient);
        let err = orchestrator.generate(&quotes(), &[]).await.unwrap_err();
        assert!(format!("{err:#}").contains("market analysis generation failed"));
    }

    #[tokio::test]
    async fn assessment_degrades_to_empty_string() {
        let orchestrator = ReportOrchestrator::new(&FailingClient);
        let comparison = EarningsComparison {
            ticker: "BBAS3".to_string(),
            name: "Banco do Brasil".to_string(),
            sector: "Financeiro".to_string(),
            latest_revenue: Some(2.2e9),
            latest_net_income: Some(4.0e8),
            revenue_delta: Some(10.0),
            net_income_delta: Some(-20.0),
            reported_at: None,
            next_earnings_date: None,
        };
        assert_eq!(orchestrator.assess_earnings(&[comparison]).await, "");
        assert_eq!(orchestrator.assess_earnings(&[]).await, "");
    }

    #[tokio::test]
    async fn assessment_prompt_marks_missing_data() {
        let client = RecordingClient::new();
        let orchestrator = ReportOrchestrator::new(&client);
        let comparison = EarningsComparison {
            ticker: "RANI3".to_string(),
            name: "Irani".to_string(),
            sector: "Papel & Embalagens".to_string(),
            latest_revenue: None,
            latest_net_income: None,
            revenue_delta: None,
            net_income_delta: None,
            reported_at: None,
            next_earnings_date: None,
        };
        orchestrator.assess_earnings(&[comparison]).await;

        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("RANI3 (Irani): dados insuficientes"));
    }
}
