use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Equity,
    Crypto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Provider symbol, e.g. "CXSE3.SA" or "BTC-USD".
    pub symbol: String,
    /// Display ticker with the listing suffix stripped.
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub kind: AssetKind,
}

impl Asset {
    pub fn new(symbol: &str, name: &str, sector: &str) -> Self {
        let kind = if symbol.ends_with("-USD") {
            AssetKind::Crypto
        } else {
            AssetKind::Equity
        };
        let ticker = symbol
            .trim_end_matches(".SA")
            .trim_end_matches("-USD")
            .to_string();
        Self {
            symbol: symbol.to_string(),
            ticker,
            name: name.to_string(),
            sector: sector.to_string(),
            kind,
        }
    }

    pub fn currency_prefix(&self) -> &'static str {
        match self.kind {
            AssetKind::Crypto => "US$",
            AssetKind::Equity => "R$",
        }
    }
}

/// The fixed B3 watch-list plus one crypto reference. Membership is
/// configuration for a single run, never mutated while the run lives.
pub fn default_watchlist() -> Vec<Asset> {
    vec![
        Asset::new("CXSE3.SA", "Caixa Seguridade", "Seguros & Financeiro"),
        Asset::new("RANI3.SA", "Irani", "Papel & Embalagens"),
        Asset::new("TAEE3.SA", "Taesa", "Energia Elétrica"),
        Asset::new("CSAN3.SA", "Cosan", "Energia & Logística"),
        Asset::new("BBAS3.SA", "Banco do Brasil", "Financeiro"),
        Asset::new("PETR3.SA", "Petrobras", "Petróleo & Gás"),
        Asset::new("BTC-USD", "Bitcoin", "Criptomoeda"),
    ]
}

/// Optional override: WATCHLIST="CXSE3.SA=Caixa Seguridade|Seguros;..."
/// Malformed entries are skipped; an empty result falls back to the default.
pub fn watchlist_from_env() -> Vec<Asset> {
    match std::env::var("WATCHLIST") {
        Ok(raw) => parse_watchlist(&raw).unwrap_or_else(default_watchlist),
        Err(_) => default_watchlist(),
    }
}

fn parse_watchlist(raw: &str) -> Option<Vec<Asset>> {
    let mut out = Vec::new();
    for entry in raw.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (symbol, rest) = entry.split_once('=')?;
        let (name, sector) = rest.split_once('|')?;
        out.push(Asset::new(symbol.trim(), name.trim(), sector.trim()));
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
