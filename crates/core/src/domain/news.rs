use serde::{Deserialize, Serialize};

pub const NEUTRAL_SCORE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "Otimista")]
    Optimistic,
    #[serde(rename = "Pessimista")]
    Pessimistic,
    #[serde(rename = "Neutro")]
    Neutral,
}

impl Sentiment {
    /// Lenient mapping from the model's label; anything unknown is Neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Otimista" => Sentiment::Optimistic,
            "Pessimista" => Sentiment::Pessimistic,
            _ => Sentiment::Neutral,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Optimistic => write!(f, "Otimista"),
            Sentiment::Pessimistic => write!(f, "Pessimista"),
            Sentiment::Neutral => write!(f, "Neutro"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "Curto")]
    Short,
    #[serde(rename = "Longo")]
    Long,
}

impl Horizon {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Longo" => Horizon::Long,
            _ => Horizon::Short,
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Horizon::Short => write!(f, "Curto"),
            Horizon::Long => write!(f, "Longo"),
        }
    }
}

/// One headline for an asset. Sentiment and horizon start at their neutral
/// defaults and are written exactly once per run by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
    /// Provider timestamp, kept as the display prefix the provider sent.
    pub published_at: String,
    pub sentiment: Sentiment,
    pub horizon: Horizon,
}

impl NewsItem {
    pub fn new(title: &str, link: &str, source: &str, published_at: &str) -> Self {
        Self {
            title: title.to_string(),
            link: link.to_string(),
            source: source.to_string(),
            published_at: published_at.to_string(),
            sentiment: Sentiment::Neutral,
            horizon: Horizon::Short,
        }
    }
}

/// Scored sentiment for one asset's recent headlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    /// Aggregate score in [0, 10], one decimal.
    pub score: f64,
    pub overall: Sentiment,
    pub impact_summary: String,
    pub items: Vec<NewsItem>,
}

impl SentimentResult {
    /// The documented fallback: score 5.0, Neutro overall, every headline
    /// tagged Neutral/Short.
    pub fn neutral(mut items: Vec<NewsItem>) -> Self {
        for item in &mut items {
            item.sentiment = Sentiment::Neutral;
            item.horizon = Horizon::Short;
        }
        Self {
            score: NEUTRAL_SCORE,
            overall: Sentiment::Neutral,
            impact_summary: String::new(),
            items,
        }
    }
}
