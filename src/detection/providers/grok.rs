//! Grok (x.ai chat completions) text adapter
//!
//! The model is prompted to answer with a strict JSON judgement. When it does
//! not, the reply text is sniffed for a fake/AI verdict instead.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ensure_success, require_text, truncate_chars, Provider, ProviderError, ProviderInput};
use crate::detection::verdict::{labels, Verdict};

pub const GROK_URL: &str = "https://api.x.ai/v1/chat/completions";
pub const GROK_MODEL: &str = "grok-beta";

const TIMEOUT: Duration = Duration::from_secs(30);

/// Characters of the submitted text included in the prompt
pub const PROMPT_MAX_CHARS: usize = 2000;

/// Confidence used when the judgement had to be sniffed from free text
pub const SNIFFED_CONFIDENCE: f64 = 0.95;

const SYSTEM_PROMPT: &str = "You are an expert AI detection system.";

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub content: String,
}

/// The JSON object the prompt asks for
#[derive(Debug, Deserialize)]
struct Judgement {
    result: String,
    confidence: f64,
}

fn build_prompt(text: &str) -> String {
    format!(
        "Analyze the following text and determine if it was written by an AI or a Human.\n\
         Text: \"{}\"\n\n\
         Provide your response in strict JSON format with two keys:\n\
         \"result\" (either \"{}\" or \"{}\")\n\
         and \"confidence\" (a float between 0.0 and 1.0).",
        truncate_chars(text, PROMPT_MAX_CHARS),
        labels::FAKE_AI_GENERATED,
        labels::REAL_HUMAN_WRITTEN,
    )
}

/// Strip markdown code fences around a JSON reply
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

/// Message content → verdict
pub fn decode_content(content: &str) -> Verdict {
    if let Ok(judgement) = serde_json::from_str::<Judgement>(strip_fences(content)) {
        return Verdict::new(judgement.result, judgement.confidence);
    }

    let is_fake = content.contains("Fake") || content.contains("AI");
    let label = if is_fake {
        labels::FAKE_AI_GENERATED
    } else {
        labels::REAL_HUMAN_WRITTEN
    };
    Verdict::new(label, SNIFFED_CONFIDENCE)
}

pub fn decode(response: ChatResponse) -> Result<Verdict, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Decode("no choices".to_string()))?;
    Ok(decode_content(&choice.message.content))
}

pub struct GrokProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

impl GrokProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            url: GROK_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl Provider for GrokProvider {
    fn name(&self) -> &'static str {
        "grok"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;
        let text = require_text(input)?;

        let payload = json!({
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(text)}
            ],
            "model": GROK_MODEL,
            "stream": false,
            "temperature": 0
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key)
            .json(&payload)
            .timeout(TIMEOUT)
            .send()
            .await?;

        decode(ensure_success(response).await?.json().await?)
    }
}
