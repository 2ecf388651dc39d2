use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{ChatClient, ChatRequest};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RETRIES: u32 = 5;

// Fixed spacing between retry attempts (upstream rate limit guidance).
const RETRY_AFTER_SECS: u64 = 15;

/// OpenAI-compatible chat completions client for the Groq endpoint.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retries: u32,
}

impl GroqClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_groq_api_key()?.to_string();
        let base_url =
            std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("GROQ_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("GROQ_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build groq http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            retries,
        })
    }

    async fn create_completion(&self, req: &ChatCompletionRequest<'_>) -> anyhow::Result<String> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.api_key);
        headers.insert("authorization", HeaderValue::from_str(&bearer)?);

        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("groq request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read groq response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse groq response JSON: {text}"))?;
        let parsed = serde_json::from_value::<ChatCompletionResponse>(raw_json.clone())
            .context("failed to decode groq response into ChatCompletionResponse")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        match content {
            Some(content) => Ok(content),
            None => Err(LlmDiagnosticsError {
                stage: "decode",
                detail: "response carried no message content".to_string(),
                raw_output: Some(text),
                raw_response_json: Some(raw_json),
            }
            .into()),
        }
    }
}

#[async_trait::async_trait]
impl ChatClient for GroqClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(Message {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: "user",
            content: request.prompt.clone(),
        });

        let req = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.create_completion(&req).await {
                Ok(content) => return Ok(content),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    tracing::warn!(attempt, model = %self.model, error = %err, "groq completion failed; retrying");
                    tokio::time::sleep(Duration::from_secs(RETRY_AFTER_SECS)).await;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_first_choice_content() {
        let v = json!({
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  texto  "}, "finish_reason": "stop"}
            ],
            "usage": {"total_tokens": 42}
        });
        let parsed: ChatCompletionResponse = serde_json::from_value(v).unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        assert_eq!(content.trim(), "texto");
    }

    #[test]
    fn tolerates_missing_content_field() {
        let v = json!({"choices": [{"message": {"role": "assistant"}}]});
        let parsed: ChatCompletionResponse = serde_json::from_value(v).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
