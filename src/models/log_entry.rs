//! Detection log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::detection::{DetectionRequest, Verdict};

/// One finished detection, as persisted and listed on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LogEntry {
    pub id: Uuid,
    /// Lowercase media type: video, audio, text, image
    pub request_type: String,
    pub input_data: String,
    pub result: String,
    pub confidence: f64,
    pub username: String,
    #[sqlx(rename = "created_at")]
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(request: &DetectionRequest, verdict: &Verdict) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_type: request.media_type.as_str().to_string(),
            input_data: request.input_data.clone(),
            result: verdict.result.clone(),
            confidence: verdict.confidence,
            username: request.username.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_fake_like(&self) -> bool {
        crate::detection::verdict::is_fake_label(&self.result)
    }

    /// `YYYY-MM-DD` bucket used by the chart
    pub fn day(&self) -> String {
        self.timestamp.format("%Y-%m-%d").to_string()
    }
}
