//! Sightengine image/video-frame adapter (`genai` model)

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::{ensure_success, file_name, require_file, Provider, ProviderError, ProviderInput};
use crate::detection::verdict::{labels, Verdict};

pub const SIGHTENGINE_URL: &str = "https://api.sightengine.com/1.0/check.json";

const TIMEOUT: Duration = Duration::from_secs(30);

/// `type.ai_generated` above this = Fake
pub const AI_GENERATED_THRESHOLD: f64 = 0.5;

/// Response shape: `{"status": "...", "type": {"ai_generated": 0.97}}`
#[derive(Debug, Deserialize)]
pub struct CheckResponse {
    #[serde(rename = "type")]
    pub kind: Option<TypeScores>,
}

#[derive(Debug, Deserialize)]
pub struct TypeScores {
    pub ai_generated: Option<f64>,
}

/// Confidence is the raw `ai_generated` score for both labels.
pub fn decode(response: CheckResponse) -> Result<Verdict, ProviderError> {
    let score = response
        .kind
        .and_then(|t| t.ai_generated)
        .ok_or_else(|| ProviderError::Decode("missing type.ai_generated".to_string()))?;

    let label = if score > AI_GENERATED_THRESHOLD {
        labels::FAKE_AI
    } else {
        labels::REAL
    };
    Ok(Verdict::new(label, score))
}

pub struct SightengineProvider {
    client: reqwest::Client,
    api_user: Option<String>,
    api_secret: Option<String>,
    url: String,
}

impl SightengineProvider {
    pub fn new(client: reqwest::Client, api_user: Option<String>, api_secret: Option<String>) -> Self {
        Self {
            client,
            api_user,
            api_secret,
            url: SIGHTENGINE_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl Provider for SightengineProvider {
    fn name(&self) -> &'static str {
        "sightengine"
    }

    fn is_configured(&self) -> bool {
        self.api_user.is_some() && self.api_secret.is_some()
    }

    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
        let (Some(user), Some(secret)) = (&self.api_user, &self.api_secret) else {
            return Err(ProviderError::NotConfigured);
        };
        let path = require_file(input)?;
        let bytes = tokio::fs::read(path).await?;

        let form = Form::new().part("media", Part::bytes(bytes).file_name(file_name(path)));

        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("models", "genai"),
                ("api_user", user.as_str()),
                ("api_secret", secret.as_str()),
            ])
            .multipart(form)
            .timeout(TIMEOUT)
            .send()
            .await?;

        let body: CheckResponse = ensure_success(response).await?.json().await?;
        decode(body)
    }
}
