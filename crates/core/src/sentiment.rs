//! Headline sentiment scoring. The model answers a strict JSON contract;
//! every failure path (no headlines, no credential, request error, bad
//! JSON) degrades to the neutral default and never aborts the run.

use crate::domain::asset::Asset;
use crate::domain::news::{Horizon, NewsItem, Sentiment, SentimentResult, NEUTRAL_SCORE};
use crate::indicators::round1;
use crate::llm::{json, ChatClient, ChatRequest};
use serde::Deserialize;
use std::collections::HashMap;

pub const HEADLINE_LIMIT: usize = 5;

const SENTIMENT_TEMPERATURE: f64 = 0.1;
const SENTIMENT_MAX_TOKENS: u32 = 500;

#[derive(Debug, Deserialize)]
struct SentimentWire {
    score: Option<f64>,
    sentimento_geral: Option<String>,
    impacto_resumo: Option<String>,
    #[serde(default)]
    noticias: Vec<SentimentItemWire>,
}

#[derive(Debug, Deserialize)]
struct SentimentItemWire {
    indice: Option<i64>,
    sentimento: Option<String>,
    prazo: Option<String>,
}

/// Scores up to HEADLINE_LIMIT most-recent-first headlines for one asset.
/// `llm: None` means no credential is configured; that case and the empty
/// input return the neutral default without touching the network.
pub async fn score_headlines(
    llm: Option<&dyn ChatClient>,
    asset: &Asset,
    mut items: Vec<NewsItem>,
) -> SentimentResult {
    items.truncate(HEADLINE_LIMIT);
    if items.is_empty() {
        return SentimentResult::neutral(items);
    }
    let Some(llm) = llm else {
        return SentimentResult::neutral(items);
    };

    let request = ChatRequest::user(prompt_for(asset, &items))
        .with_temperature(SENTIMENT_TEMPERATURE)
        .with_max_tokens(SENTIMENT_MAX_TOKENS);

    let raw = match llm.complete(request).await {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(ticker = %asset.ticker, error = %err, "sentiment request failed; using neutral default");
            return SentimentResult::neutral(items);
        }
    };

    match parse_wire(&raw) {
        Some(wire) => apply_scores(wire, items),
        None => {
            tracing::warn!(ticker = %asset.ticker, "sentiment response was not valid JSON; using neutral default");
            SentimentResult::neutral(items)
        }
    }
}

fn prompt_for(asset: &Asset, items: &[NewsItem]) -> String {
    let titles = items
        .iter()
        .enumerate()
        .map(|(i, n)| format!("{}. {}", i + 1, n.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analise notícias sobre {} ({}). Responda SOMENTE em JSON:\n\n{}\n\n\
{{\"score\": <0-10>, \"sentimento_geral\": \"<Otimista|Pessimista|Neutro>\", \
\"impacto_resumo\": \"<2 frases>\", \"noticias\": [{{\"indice\": 1, \
\"sentimento\": \"<Otimista|Pessimista|Neutro>\", \"prazo\": \"<Curto|Longo>\"}}]}}",
        asset.name, asset.ticker, titles
    )
}

fn parse_wire(raw: &str) -> Option<SentimentWire> {
    let json_str = json::extract_json(raw).unwrap_or_else(|| raw.trim().to_string());
    serde_json::from_str(&json_str).ok()
}

fn apply_scores(wire: SentimentWire, mut items: Vec<NewsItem>) -> SentimentResult {
    // 1-based indices map back onto the input order; headlines the model
    // skipped keep the Neutral/Short default.
    let by_index: HashMap<i64, &SentimentItemWire> = wire
        .noticias
        .iter()
        .filter_map(|item| item.indice.map(|i| (i, item)))
        .collect();

    for (i, item) in items.iter_mut().enumerate() {
        match by_index.get(&(i as i64 + 1)) {
            Some(scored) => {
                item.sentiment = Sentiment::from_label(scored.sentimento.as_deref().unwrap_or(""));
                item.horizon = Horizon::from_label(scored.prazo.as_deref().unwrap_or(""));
            }
            None => {
                item.sentiment = Sentiment::Neutral;
                item.horizon = Horizon::Short;
            }
        }
    }

    let score = wire.score.filter(|s| s.is_finite()).unwrap_or(NEUTRAL_SCORE);
    SentimentResult {
        score: round1(score.clamp(0.0, 10.0)),
        overall: Sentiment::from_label(wire.sentimento_geral.as_deref().unwrap_or("")),
        impact_summary: wire.impacto_resumo.unwrap_or_default(),
        items,
    }
}
