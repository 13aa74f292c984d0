//! Hugging Face Inference API adapters
//!
//! Three adapters share one client: an image deepfake model, an audio
//! deepfake model, and a two-model text ensemble. Classification models
//! answer with `[{label, score}]` or `[[{label, score}]]` depending on the
//! pipeline, so both shapes are accepted.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{
    ensure_success, require_file, require_text, truncate_chars, Provider, ProviderError,
    ProviderInput,
};
use crate::detection::verdict::{labels, Verdict};

pub const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

pub const IMAGE_MODEL: &str = "prithivMLmods/Deep-Fake-Detector-v2-Model";
pub const AUDIO_MODEL: &str = "MelodyMachine/Deepfake-audio-detection-v2-1";

/// Text ensemble, in priority order
pub const TEXT_MODELS: [&str; 2] = [
    "openai-community/roberta-base-openai-detector",
    "Hello-SimpleAI/chatgpt-detector-roberta",
];

const MEDIA_TIMEOUT: Duration = Duration::from_secs(30);
const TEXT_TIMEOUT: Duration = Duration::from_secs(20);

/// Fake score above this = Fake (image and audio)
pub const MEDIA_FAKE_THRESHOLD: f64 = 0.5;

/// Text ensemble answers only above this, for either label
pub const TEXT_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Text models see at most this many characters
pub const TEXT_MAX_CHARS: usize = 512;

// ============================================================================
// RESPONSE SHAPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// One element of a classification response
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreItem {
    Group(Vec<LabelScore>),
    Single(LabelScore),
}

pub type ClassificationOutput = Vec<ScoreItem>;

fn flatten(output: ClassificationOutput) -> Vec<LabelScore> {
    output
        .into_iter()
        .flat_map(|item| match item {
            ScoreItem::Group(group) => group,
            ScoreItem::Single(single) => vec![single],
        })
        .collect()
}

fn non_empty(output: ClassificationOutput) -> Result<Vec<LabelScore>, ProviderError> {
    let scores = flatten(output);
    if scores.is_empty() {
        return Err(ProviderError::Decode("empty classification".to_string()));
    }
    Ok(scores)
}

// ============================================================================
// DECODERS
// ============================================================================

/// Image: labels `Deepfake`/`Fake` carry the fake score
pub fn decode_image(output: ClassificationOutput) -> Result<Verdict, ProviderError> {
    let fake_score = non_empty(output)?
        .iter()
        .filter(|s| s.label == "Deepfake" || s.label == "Fake")
        .map(|s| s.score)
        .fold(0.0, f64::max);

    Ok(if fake_score > MEDIA_FAKE_THRESHOLD {
        Verdict::new(labels::FAKE_DEEPFAKE_IMAGE, fake_score)
    } else {
        Verdict::new(labels::REAL_AUTHENTIC, 1.0 - fake_score)
    })
}

/// Audio: highest score among `fake`/`spoof`/`ai` labels
pub fn decode_audio(output: ClassificationOutput) -> Result<Verdict, ProviderError> {
    let fake_score = non_empty(output)?
        .iter()
        .filter(|s| matches!(s.label.to_lowercase().as_str(), "fake" | "spoof" | "ai"))
        .map(|s| s.score)
        .fold(0.0, f64::max);

    Ok(if fake_score > MEDIA_FAKE_THRESHOLD {
        Verdict::new(labels::FAKE_AUDIO_DEEPFAKE, fake_score)
    } else {
        Verdict::new(labels::REAL_AUTHENTIC_AUDIO, 1.0 - fake_score)
    })
}

/// Text: answer only when one side clears the high-precision threshold
pub fn decode_text(output: ClassificationOutput) -> Result<Verdict, ProviderError> {
    let mut fake_score = 0.0;
    let mut real_score = 0.0;

    for item in flatten(output) {
        let label = item.label.to_lowercase();
        if label.contains("fake") || label.contains("chatgpt") {
            fake_score = item.score;
        } else if label.contains("real") || label.contains("human") {
            real_score = item.score;
        }
    }

    if fake_score > TEXT_CONFIDENCE_THRESHOLD {
        Ok(Verdict::new(labels::FAKE_AI_GENERATED, fake_score))
    } else if real_score > TEXT_CONFIDENCE_THRESHOLD {
        Ok(Verdict::new(labels::REAL_HUMAN_WRITTEN, real_score))
    } else {
        Err(ProviderError::BelowThreshold)
    }
}

// ============================================================================
// CLIENT
// ============================================================================

#[derive(Clone)]
struct HfClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl HfClient {
    fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: HF_INFERENCE_URL.to_string(),
        }
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::NotConfigured)
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), model)
    }

    async fn classify_bytes(
        &self,
        model: &str,
        bytes: Vec<u8>,
    ) -> Result<ClassificationOutput, ProviderError> {
        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(self.key()?)
            .body(bytes)
            .timeout(MEDIA_TIMEOUT)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    async fn classify_text(
        &self,
        model: &str,
        text: &str,
    ) -> Result<ClassificationOutput, ProviderError> {
        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(self.key()?)
            .json(&json!({ "inputs": text }))
            .timeout(TEXT_TIMEOUT)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }
}

// ============================================================================
// ADAPTERS
// ============================================================================

pub struct HfImageProvider {
    hf: HfClient,
}

impl HfImageProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { hf: HfClient::new(client, api_key) }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.hf.base_url = url.into();
        self
    }
}

#[async_trait]
impl Provider for HfImageProvider {
    fn name(&self) -> &'static str {
        "huggingface-image"
    }

    fn is_configured(&self) -> bool {
        self.hf.api_key.is_some()
    }

    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
        let bytes = tokio::fs::read(require_file(input)?).await?;
        decode_image(self.hf.classify_bytes(IMAGE_MODEL, bytes).await?)
    }
}

pub struct HfAudioProvider {
    hf: HfClient,
}

impl HfAudioProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { hf: HfClient::new(client, api_key) }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.hf.base_url = url.into();
        self
    }
}

#[async_trait]
impl Provider for HfAudioProvider {
    fn name(&self) -> &'static str {
        "huggingface-audio"
    }

    fn is_configured(&self) -> bool {
        self.hf.api_key.is_some()
    }

    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
        let bytes = tokio::fs::read(require_file(input)?).await?;
        decode_audio(self.hf.classify_bytes(AUDIO_MODEL, bytes).await?)
    }
}

/// Tries `TEXT_MODELS` in order; the first model clearing the threshold wins.
/// A model that errors or stays below threshold hands over to the next one.
pub struct HfTextEnsemble {
    hf: HfClient,
}

impl HfTextEnsemble {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { hf: HfClient::new(client, api_key) }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.hf.base_url = url.into();
        self
    }
}

#[async_trait]
impl Provider for HfTextEnsemble {
    fn name(&self) -> &'static str {
        "huggingface-text"
    }

    fn is_configured(&self) -> bool {
        self.hf.api_key.is_some()
    }

    async fn call(&self, input: ProviderInput<'_>) -> Result<Verdict, ProviderError> {
        let text = truncate_chars(require_text(input)?, TEXT_MAX_CHARS);

        for model in TEXT_MODELS {
            let outcome = match self.hf.classify_text(model, &text).await {
                Ok(output) => decode_text(output),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(verdict) => return Ok(verdict),
                Err(ProviderError::BelowThreshold) => {
                    tracing::debug!(model, "Text model below threshold");
                }
                Err(err) => {
                    tracing::warn!(model, "Text model failed: {}", err);
                }
            }
        }

        Err(ProviderError::BelowThreshold)
    }
}
