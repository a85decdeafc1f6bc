/// LLM Client — the single point of entry for all external text-API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All word-problem generation MUST go through this module, and it is awaited
/// once per batch, never once per problem.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::problem::{ProblemLayout, ProblemRecord};
use crate::models::settings::ModuleSettings;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all word-problem calls.
/// Intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM returned no problems")]
    EmptyBatch,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// One word problem as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordProblem {
    pub question: String,
    pub answer: String,
}

/// Pluggable batch source for AI word problems. `AppState` holds an
/// `Arc<dyn WordProblemSource>` so tests can swap in a stub.
#[async_trait]
pub trait WordProblemSource: Send + Sync {
    /// Produces exactly `count` problems for the given module in one call.
    async fn generate_batch(
        &self,
        module_key: &str,
        settings: &ModuleSettings,
        count: u32,
    ) -> Result<Vec<ProblemRecord>, LlmError>;
}

/// The production client. Wraps the Anthropic Messages API with retry logic
/// and structured-output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Convenience method that calls the LLM and deserializes the text
    /// response as JSON. The prompt must instruct the model to return JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

#[async_trait]
impl WordProblemSource for LlmClient {
    async fn generate_batch(
        &self,
        module_key: &str,
        settings: &ModuleSettings,
        count: u32,
    ) -> Result<Vec<ProblemRecord>, LlmError> {
        let prompt = prompts::WORD_PROBLEM_PROMPT_TEMPLATE
            .replace("{count}", &count.to_string())
            .replace("{operation}", module_key)
            .replace("{max_value}", &settings.max_value.max(1).to_string());

        let problems: Vec<WordProblem> =
            self.call_json(&prompt, prompts::WORD_PROBLEM_SYSTEM).await?;

        if problems.is_empty() {
            return Err(LlmError::EmptyBatch);
        }
        if problems.len() != count as usize {
            warn!(
                "word-problem batch size mismatch: asked {count}, got {}",
                problems.len()
            );
        }

        Ok(problems
            .into_iter()
            .take(count as usize)
            .map(|p| ProblemRecord {
                question: p.question,
                answer: p.answer,
                category: format!("{module_key}-word"),
                layout: Some(ProblemLayout::Horizontal),
                display: None,
            })
            .collect())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[{\"question\": \"q\", \"answer\": \"1\"}]\n```";
        assert_eq!(
            strip_json_fences(input),
            "[{\"question\": \"q\", \"answer\": \"1\"}]"
        );
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[]\n```";
        assert_eq!(strip_json_fences(input), "[]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "[]";
        assert_eq!(strip_json_fences(input), "[]");
    }

    #[test]
    fn test_word_problem_deserializes() {
        let json = r#"{"question": "Sam has 3 pears and eats 1. How many are left?", "answer": "2"}"#;
        let problem: WordProblem = serde_json::from_str(json).unwrap();
        assert_eq!(problem.answer, "2");
    }

    #[test]
    fn test_prompt_template_placeholders_fill() {
        let prompt = prompts::WORD_PROBLEM_PROMPT_TEMPLATE
            .replace("{count}", "12")
            .replace("{operation}", "addition")
            .replace("{max_value}", "20");
        assert!(prompt.contains("12 math word problems"));
        assert!(!prompt.contains("{count}"));
        assert!(!prompt.contains("{operation}"));
        assert!(!prompt.contains("{max_value}"));
    }
}
