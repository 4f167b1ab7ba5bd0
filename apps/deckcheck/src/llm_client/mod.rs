/// LLM Client: the single point of entry for all chat-completion calls in DeckCheck.
///
/// ARCHITECTURAL RULE: No other module may call the OpenAI API directly.
/// Actors go through the `AiGateway` trait; `LlmClient` is the production implementation.
///
/// Cost is never computed here. Callers hand the returned usage to the cost ledger.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod tokens;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Model used when a caller does not pick one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM response missing usage")]
    MissingUsage,

    #[error("Invalid LLM output: {0}")]
    InvalidOutput(String),
}

/// Per-call options for a completion.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
    pub system_message: String,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>, system_message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            system_message: system_message.into(),
        }
    }
}

/// Token usage reported by the service. `cost_usd` stays at zero here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default)]
    pub cost_usd: f64,
}

/// A parsed structured response plus the usage that produced it.
#[derive(Debug, Clone)]
pub struct Completion<T> {
    pub result: T,
    pub usage: TokenUsage,
}

/// Submit a prompt, get one JSON document back.
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn complete_json(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion<Value>, LlmError>;
}

/// Calls the gateway and deserializes the JSON document as `T`.
pub async fn complete<T: DeserializeOwned>(
    gateway: &dyn AiGateway,
    prompt: &str,
    options: &CompletionOptions,
) -> Result<Completion<T>, LlmError> {
    let completion = gateway.complete_json(prompt, options).await?;
    Ok(Completion {
        result: serde_json::from_value(completion.result)?,
        usage: completion.usage,
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

/// Production gateway over the OpenAI chat-completions API in JSON mode.
/// Failures are returned as-is; there is no retry.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }
}

#[async_trait]
impl AiGateway for LlmClient {
    async fn complete_json(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<Completion<Value>, LlmError> {
        let request_body = ChatRequest {
            model: &options.model,
            temperature: options.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &options.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let usage = chat.usage.ok_or(LlmError::MissingUsage)?;
        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)?;

        debug!(
            model = %options.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "LLM call succeeded"
        );

        let result = serde_json::from_str(strip_json_fences(&text))?;
        Ok(Completion {
            result,
            usage: TokenUsage {
                cost_usd: 0.0,
                ..usage
            },
        })
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(stripped)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_chat_response_usage_defaults_cost_to_zero() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"rating\": 5}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.cost_usd, 0.0);
    }

    #[test]
    fn test_options_default_temperature() {
        let options = CompletionOptions::new(DEFAULT_MODEL, "system");
        assert_eq!(options.temperature, 0.3);
    }
}
