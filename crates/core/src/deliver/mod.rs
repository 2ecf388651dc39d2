//! Delivery channels. Both are stateless, independent, and report their
//! outcome as a value: a failed push never panics and never affects the
//! other channel.

pub mod email;
pub mod telegram;

use crate::domain::quote::QuoteSnapshot;
use std::fmt;

#[derive(Debug, Clone)]
pub struct DeliveryError {
    pub channel: &'static str,
    pub detail: String,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} delivery failed: {}", self.channel, self.detail)
    }
}

impl std::error::Error for DeliveryError {}

pub type DeliveryResult = Result<(), DeliveryError>;

/// Per-asset one-liners shared by both channels.
pub fn summary_lines(quotes: &[QuoteSnapshot]) -> Vec<String> {
    quotes
        .iter()
        .map(|q| {
            let marker = if q.variation > 0.0 { "🟢" } else { "🔴" };
            format!("{marker} {} {:+.2}%", q.asset.ticker, q.variation)
        })
        .collect()
}

/// Leading slice of a narrative block, cut on characters.
pub fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::Asset;
    use crate::domain::report::Report;
    use chrono::{TimeZone, Utc};

    fn quote() -> QuoteSnapshot {
        QuoteSnapshot {
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
        }
    }

    #[test]
    fn summary_marks_direction() {
        let up = quote();
        let mut down = up.clone();
        down.variation = -1.5;

        let lines = summary_lines(&[up, down]);
        assert!(lines[0].starts_with("🟢"));
        assert!(lines[1].starts_with("🔴"));
        assert!(lines[0].contains("+2.94%"));
    }

    #[test]
    fn preview_cuts_on_characters() {
        assert_eq!(preview("curto", 10), "curto");
        assert_eq!(preview("análise extensa", 7), "análise...");
    }

    #[tokio::test]
    async fn channel_failure_does_not_affect_the_other() {
        let report = Report {
            analysis: "Semana estável.".to_string(),
            recommendations: "Manter.".to_string(),
            generated_at: Utc.with_ymd_and_hms(2026, 7, 31, 18, 0, 0).unwrap(),
        };
        let quotes = vec![quote()];

        // Channel A fails against a dead endpoint and reports a value.
        let telegram = telegram::TelegramNotifier::new("token", "chat")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let err_a = telegram
            .send_report(&quotes, &report, b"%PDF-stub")
            .await
            .unwrap_err();
        assert_eq!(err_a.channel, "telegram");

        // Channel B stays callable and reports its own outcome.
        let email = email::EmailNotifier::new("a@b.dev", "pw", "c@d.dev", "127.0.0.1").unwrap();
        let err_b = email
            .send_report(&quotes, &report, b"%PDF-stub")
            .await
            .unwrap_err();
        assert_eq!(err_b.channel, "email");
    }
}
