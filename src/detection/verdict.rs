//! Verdict Types
//!
//! The canonical answer shape shared by every strategy in the fallback chain,
//! plus the request that drives one run of the chain.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// LABELS
// ============================================================================

/// Canonical result labels
pub mod labels {
    pub const FAKE_AI: &str = "Fake (AI)";
    pub const REAL: &str = "Real";
    pub const FAKE_DEEPFAKE_IMAGE: &str = "Fake (Deepfake Image)";
    pub const REAL_AUTHENTIC: &str = "Real (Authentic)";
    pub const FAKE_AI_CLONED: &str = "Fake (AI Cloned)";
    pub const FAKE_AUDIO_DEEPFAKE: &str = "Fake (Audio Deepfake)";
    pub const REAL_AUTHENTIC_AUDIO: &str = "Real (Authentic Audio)";
    pub const FAKE_AI_GENERATED: &str = "Fake (AI Generated)";
    pub const REAL_HUMAN_WRITTEN: &str = "Real (Human Written)";
    pub const FAKE_HIGH_PROBABILITY: &str = "Fake (High Probability)";
    pub const SUSPICIOUS: &str = "Suspicious";
    pub const REAL_LIKELY_AUTHENTIC: &str = "Real (Likely Authentic)";
    pub const UNKNOWN: &str = "Unknown";
    pub const REAL_SAFE_FALLBACK: &str = "Real (Safe Fallback)";
    pub const ANALYSIS_ERROR_PREFIX: &str = "Analysis Error: ";
}

/// True when a result label counts as "fake" for dashboard statistics
pub fn is_fake_label(label: &str) -> bool {
    label.contains("Fake") || label.contains("AI")
}

// ============================================================================
// VERDICT
// ============================================================================

/// Canonical `{result, confidence}` answer for one detection request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub result: String,
    /// Certainty in `result`, always within [0, 1]
    pub confidence: f64,
}

/// Confidence forced into [0, 1], and whether it had to be changed
fn bounded_confidence(raw: f64) -> (f64, bool) {
    if !raw.is_finite() {
        return (0.0, true);
    }
    let bounded = raw.clamp(0.0, 1.0);
    (bounded, bounded != raw)
}

impl Verdict {
    pub fn new(result: impl Into<String>, confidence: f64) -> Self {
        let result = result.into();
        let (confidence, adjusted) = bounded_confidence(confidence);
        if adjusted {
            tracing::warn!(
                result = %result,
                clamped_to = confidence,
                "Confidence outside [0, 1], check the provider's score scale"
            );
        }
        Self { result, confidence }
    }

    /// Outermost circuit-breaker answer
    pub fn safe_fallback() -> Self {
        Self::new(labels::REAL_SAFE_FALLBACK, 0.5)
    }

    /// Extraction failure surfaced verbatim to the caller
    pub fn analysis_error(message: &str) -> Self {
        Self::new(format!("{}{}", labels::ANALYSIS_ERROR_PREFIX, message), 0.0)
    }

    pub fn is_fake_like(&self) -> bool {
        is_fake_label(&self.result)
    }
}

// ============================================================================
// MEDIA TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Text,
    Image,
}

impl MediaType {
    /// Display order used by dashboard per-type statistics
    pub const ALL: [MediaType; 4] = [
        MediaType::Video,
        MediaType::Audio,
        MediaType::Text,
        MediaType::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
            MediaType::Text => "text",
            MediaType::Image => "image",
        }
    }

    /// Capitalised name used in chart payloads
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaType::Video => "Video",
            MediaType::Audio => "Audio",
            MediaType::Text => "Text",
            MediaType::Image => "Image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "video" => Some(MediaType::Video),
            "audio" => Some(MediaType::Audio),
            "text" => Some(MediaType::Text),
            "image" => Some(MediaType::Image),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// One incoming detection call
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub media_type: MediaType,
    /// Raw text for text requests, original filename otherwise
    pub input_data: String,
    /// Uploaded bytes on disk, absent for text
    pub file_path: Option<PathBuf>,
    pub username: String,
}

impl DetectionRequest {
    pub fn text(text: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Text,
            input_data: text.into(),
            file_path: None,
            username: username.into(),
        }
    }

    pub fn file(
        media_type: MediaType,
        filename: impl Into<String>,
        path: PathBuf,
        username: impl Into<String>,
    ) -> Self {
        Self {
            media_type,
            input_data: filename.into(),
            file_path: Some(path),
            username: username.into(),
        }
    }
}
