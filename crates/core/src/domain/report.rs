use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two AI-generated narrative blocks. Composed once per run and
/// immutable afterward; consumed by the renderer and the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub analysis: String,
    pub recommendations: String,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    /// Human label used in the PDF header and delivery messages.
    pub fn generated_label(&self) -> String {
        self.generated_at.format("%d/%m/%Y às %H:%M").to_string()
    }
}
