//! Risk scoring over a batch of detection confidences

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Average strictly above this is High
pub const HIGH_RISK_THRESHOLD: f64 = 0.8;
/// Average strictly above this (and not High) is Medium
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_average(average: f64) -> Self {
        if average > HIGH_RISK_THRESHOLD {
            Self::High
        } else if average > MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RiskRequest {
    #[serde(default)]
    pub confidences: Vec<f64>,
}

/// Wire response of `/risk_score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub average_confidence: f64,
}

impl RiskAssessment {
    /// `None` for an empty list
    pub fn from_confidences(confidences: &[f64]) -> Option<Self> {
        if confidences.is_empty() {
            return None;
        }
        let average = confidences.iter().sum::<f64>() / confidences.len() as f64;
        Some(Self {
            risk_level: RiskLevel::from_average(average),
            average_confidence: average,
        })
    }
}

/// Persisted form, one per `/risk_score` call
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub username: String,
    pub confidences: Vec<f64>,
    pub risk_level: RiskLevel,
    pub average_confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl RiskReport {
    pub fn new(username: &str, confidences: Vec<f64>, assessment: &RiskAssessment) -> Self {
        Self {
            username: username.to_string(),
            confidences,
            risk_level: assessment.risk_level,
            average_confidence: assessment.average_confidence,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let high = RiskAssessment::from_confidences(&[0.9, 0.95, 0.85]).unwrap();
        assert_eq!(high.risk_level, RiskLevel::High);
        assert!((high.average_confidence - 0.9).abs() < 1e-9);

        assert_eq!(
            RiskAssessment::from_confidences(&[0.6, 0.6]).unwrap().risk_level,
            RiskLevel::Medium
        );
        assert_eq!(
            RiskAssessment::from_confidences(&[0.2]).unwrap().risk_level,
            RiskLevel::Low
        );
    }

    #[test]
    fn test_documented_examples() {
        let high = RiskAssessment::from_confidences(&[0.9, 0.85]).unwrap();
        assert_eq!(high.risk_level, RiskLevel::High);
        assert!((high.average_confidence - 0.875).abs() < 1e-9);

        let medium = RiskAssessment::from_confidences(&[0.6, 0.55]).unwrap();
        assert_eq!(medium.risk_level, RiskLevel::Medium);
        assert!((medium.average_confidence - 0.575).abs() < 1e-9);

        let low = RiskAssessment::from_confidences(&[0.1, 0.2]).unwrap();
        assert_eq!(low.risk_level, RiskLevel::Low);
        assert!((low.average_confidence - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        assert_eq!(RiskLevel::from_average(0.8), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_average(0.5), RiskLevel::Low);
    }

    #[test]
    fn test_empty_has_no_assessment() {
        assert!(RiskAssessment::from_confidences(&[]).is_none());
    }

    #[test]
    fn test_wire_shape() {
        let assessment = RiskAssessment::from_confidences(&[1.0]).unwrap();
        let json = serde_json::to_value(&assessment).unwrap();
        assert_eq!(json["risk_level"], "High");
        assert_eq!(json["average_confidence"], 1.0);
    }
}
