//! Local Audio Heuristic Classifier
//!
//! Rule-based scorer over extracted audio features, used only when no remote
//! audio provider answers. Deterministic and explainable: every triggered rule
//! adds a fixed number of points and a human readable description.
//!
//! Input: FeatureMap (audio keys)
//! Output: HeuristicAnalysis

use super::features::FeatureMap;
use super::verdict::{labels, Verdict};

// ============================================================================
// RULE THRESHOLDS
// ============================================================================

/// Spectral centroid variance below this = unnaturally consistent brightness
pub const CENTROID_VAR_LOW: f64 = 50_000.0;

/// Spectral centroid variance above this = artifacts
pub const CENTROID_VAR_HIGH: f64 = 5_000_000.0;

/// Mean zero-crossing rate below this = signal too smooth
pub const ZCR_LOW: f64 = 0.015;

/// First MFCC coefficient variance below this = flat energy dynamics
pub const MFCC0_VAR_LOW: f64 = 100.0;

/// Mean 85% rolloff below this (Hz) = missing high frequencies
pub const ROLLOFF_LOW_HZ: f64 = 3_000.0;

/// Fraction of digitally silent samples above this = edited/synthetic
pub const SILENCE_RATIO_HIGH: f64 = 0.3;

/// Average chroma variance below this = monotone pitch
pub const CHROMA_VAR_LOW: f64 = 0.005;

// ============================================================================
// RULE POINTS
// ============================================================================

pub const CENTROID_LOW_POINTS: u32 = 20;
pub const CENTROID_HIGH_POINTS: u32 = 10;
pub const ZCR_POINTS: u32 = 25;
pub const MFCC_POINTS: u32 = 15;
pub const ROLLOFF_POINTS: u32 = 30;
pub const SILENCE_POINTS: u32 = 20;
pub const CHROMA_POINTS: u32 = 25;

/// Score floor/ceiling before scaling to a probability
pub const SCORE_MIN: u32 = 10;
pub const SCORE_MAX: u32 = 95;

/// Probability above this = Fake
pub const FAKE_THRESHOLD: f64 = 0.6;

/// Probability above this (and not Fake) = Suspicious
pub const SUSPICIOUS_THRESHOLD: f64 = 0.4;

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicAnalysis {
    pub result: String,
    /// Certainty in `result` (inverted for Real), rounded to 2 decimals
    pub confidence: f64,
    /// Clamped probability of the audio being synthetic, before inversion
    pub fake_probability: f64,
    pub reason: String,
    /// Every triggered rule, in evaluation order
    pub details: Vec<String>,
}

impl HeuristicAnalysis {
    pub fn verdict(&self) -> Verdict {
        Verdict::new(self.result.clone(), self.confidence)
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

/// Stateless audio classifier; construct once and share
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioHeuristicModel;

impl AudioHeuristicModel {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, features: &FeatureMap) -> HeuristicAnalysis {
        if features.is_empty() {
            return HeuristicAnalysis {
                result: labels::UNKNOWN.to_string(),
                confidence: 0.0,
                fake_probability: 0.0,
                reason: "No features extracted".to_string(),
                details: vec![],
            };
        }

        let mut score = 0u32;
        let mut details = Vec::new();

        // Rule 1: spectral brightness variance
        let centroid_var = features.scalar("spectral_centroid_var").unwrap_or(0.0);
        if centroid_var < CENTROID_VAR_LOW {
            score += CENTROID_LOW_POINTS;
            details.push("Unnaturally consistent spectral brightness".to_string());
        } else if centroid_var > CENTROID_VAR_HIGH {
            score += CENTROID_HIGH_POINTS;
            details.push("Anomalous spectral variance".to_string());
        }

        // Rule 2: zero-crossing rate
        let zcr_mean = features.scalar("zcr_mean").unwrap_or(0.0);
        if zcr_mean < ZCR_LOW {
            score += ZCR_POINTS;
            details.push("Audio signal is unnaturally smooth (low ZCR)".to_string());
        }

        // Rule 3: energy dynamics (first MFCC coefficient)
        if let Some(&mfcc0_var) = features.series("mfcc_var").and_then(|v| v.first()) {
            if mfcc0_var < MFCC0_VAR_LOW {
                score += MFCC_POINTS;
                details.push("Low energy dynamics".to_string());
            }
        }

        // Rule 4: high frequency rolloff
        let rolloff_mean = features.scalar("spectral_rolloff_mean").unwrap_or(0.0);
        if rolloff_mean < ROLLOFF_LOW_HZ {
            score += ROLLOFF_POINTS;
            details.push("Missing high-frequency details (common in older TTS)".to_string());
        }

        // Rule 5: digital silence
        let silence_ratio = features.scalar("silence_ratio").unwrap_or(0.0);
        if silence_ratio > SILENCE_RATIO_HIGH {
            score += SILENCE_POINTS;
            details.push("Unnatural digital silence detected".to_string());
        }

        // Rule 6: pitch monotony
        if let Some(chroma_var) = features.series("chroma_var").filter(|v| !v.is_empty()) {
            let avg = chroma_var.iter().sum::<f64>() / chroma_var.len() as f64;
            if avg < CHROMA_VAR_LOW {
                score += CHROMA_POINTS;
                details.push("Robotic/Monotone pitch detected".to_string());
            }
        }

        let fake_probability = f64::from(score.clamp(SCORE_MIN, SCORE_MAX)) / 100.0;

        let (result, confidence, reason) = if fake_probability > FAKE_THRESHOLD {
            let reason = details
                .first()
                .cloned()
                .unwrap_or_else(|| "Multiple statistical anomalies detected".to_string());
            (labels::FAKE_HIGH_PROBABILITY, fake_probability, reason)
        } else if fake_probability > SUSPICIOUS_THRESHOLD {
            let reason = details
                .first()
                .cloned()
                .unwrap_or_else(|| "Some unnatural characteristics detected".to_string());
            (labels::SUSPICIOUS, fake_probability, reason)
        } else {
            (
                labels::REAL_LIKELY_AUTHENTIC,
                1.0 - fake_probability,
                "Natural signal characteristics".to_string(),
            )
        };

        HeuristicAnalysis {
            result: result.to_string(),
            confidence: round2(confidence),
            fake_probability,
            reason,
            details,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================
