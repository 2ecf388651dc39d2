pub mod error;
pub mod groq;
pub mod json;

/// One chat-style completion request. Prompts are built by the callers;
/// the client only owns transport, retry and decoding concerns.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn user(prompt: String) -> Self {
        Self {
            system: None,
            prompt,
            temperature: 0.3,
            max_tokens: 1024,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: ChatRequest) -> anyhow::Result<String>;
}
