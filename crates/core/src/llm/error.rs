use serde_json::Value;
use std::fmt;

/// Carries enough of the failed exchange to debug a bad model response
/// without re-running the pipeline.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM error (stage={}): {}", self.stage, self.detail)
    }
}

impl std::error::Error for LlmDiagnosticsError {}
