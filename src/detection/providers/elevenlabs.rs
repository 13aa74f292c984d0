//! ElevenLabs audio adapter

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use super::{ensure_success, file_name, require_file, Provider, ProviderError, ProviderInput};
use crate::detection::verdict::{labels, Verdict};

pub const ELEVENLABS_URL: &str = "https://api.elevenlabs.io/v1/audio-native/isolation";

const TIMEOUT: Duration = Duration::from_secs(30);

/// Confidence assumed when the response carries none
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Boolean-flag response: `{"is_ai": true, "confidence": 0.99}`; some
/// deployments report `detected` instead of `is_ai`.
#[derive(Debug, Default, Deserialize)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub is_ai: Option<bool>,
    #[serde(default)]
    pub detected: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

pub fn decode(response: ClassifierResponse) -> Result<Verdict, ProviderError> {
    let is_ai = response.is_ai.unwrap_or(false) || response.detected.unwrap_or(false);
    let confidence = response.confidence.unwrap_or(DEFAULT_CONFIDENCE);

    let label = if is_ai {
        labels::FAKE_AI_CLONED
    } else {
        labels::REAL_AUTHENTIC
    };
    Ok(Verdict::new(label, confidence))
}

pub struct ElevenLabsProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

impl ElevenLabsProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            url: ELEVENLABS_URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl Provider for ElevenLabsProvider {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;
        let path = require_file(input)?;
        let bytes = tokio::fs::read(path).await?;

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name(path)));

        let response = self
            .client
            .post(&self.url)
            .header("xi-api-key", key)
            .multipart(form)
            .timeout(TIMEOUT)
            .send()
            .await?;

        let response = match ensure_success(response).await {
            Err(ProviderError::InvalidCredentials(status)) => {
                tracing::warn!("ElevenLabs API key invalid");
                return Err(ProviderError::InvalidCredentials(status));
            }
            other => other?,
        };

        decode(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::providers::test_support;
    use axum::{http::StatusCode, routing::post, Router};
    use serde_json::json;
    use std::io::Write;

    fn parse(value: serde_json::Value) -> ClassifierResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_flags() {
        assert_eq!(
            decode(parse(json!({"is_ai": true, "confidence": 0.99}))).unwrap(),
            Verdict::new("Fake (AI Cloned)", 0.99)
        );
        assert_eq!(
            decode(parse(json!({"detected": true}))).unwrap(),
            Verdict::new("Fake (AI Cloned)", 0.9)
        );
        assert_eq!(
            decode(parse(json!({}))).unwrap(),
            Verdict::new("Real (Authentic)", 0.9)
        );
    }

    #[tokio::test]
    async fn test_rejected_key_is_no_answer() {
        let router = Router::new().route("/classify", post(|| async { StatusCode::UNAUTHORIZED }));
        let base = test_support::serve(router).await;
        let provider = ElevenLabsProvider::new(reqwest::Client::new(), Some("bad".into()))
            .with_url(format!("{}/classify", base));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RIFF....WAVE").unwrap();

        let err = provider.call(ProviderInput::File(file.path())).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidCredentials(401)));
        assert!(provider.invoke(ProviderInput::File(file.path())).await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_no_answer() {
        let provider = ElevenLabsProvider::new(reqwest::Client::new(), Some("key".into()));
        let missing = std::path::Path::new("/no/such/upload.wav");
        assert!(matches!(
            provider.call(ProviderInput::File(missing)).await,
            Err(ProviderError::Io(_))
        ));
    }
}
