//! User feedback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    pub username: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    pub fn new(username: &str, message: String) -> Self {
        Self {
            username: username.to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(min = 1, message = "Feedback message cannot be empty"))]
    pub message: String,
}
