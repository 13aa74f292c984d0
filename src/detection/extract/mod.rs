//! Feature Extraction
//!
//! Media-specific extractors behind one async contract. A failure is a typed
//! `ExtractError`, distinct from "extracted, but no signal".

use async_trait::async_trait;

use super::features::{ExtractError, FeatureMap};
use super::verdict::{DetectionRequest, MediaType};

pub mod audio;
pub mod text;
pub mod video;

#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    async fn extract(&self, request: &DetectionRequest) -> Result<FeatureMap, ExtractError>;
}

/// Default extractor: dispatches on the request's media type
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaExtractor;

#[async_trait]
impl FeatureExtractor for MediaExtractor {
    async fn extract(&self, request: &DetectionRequest) -> Result<FeatureMap, ExtractError> {
        match request.media_type {
            MediaType::Text => Ok(text::extract(&request.input_data)),
            MediaType::Image => Ok(FeatureMap::new()),
            MediaType::Audio => {
                let path = request.file_path.clone().ok_or(ExtractError::FileNotFound)?;
                tokio::task::spawn_blocking(move || audio::extract(&path))
                    .await
                    .map_err(|e| ExtractError::Decode(e.to_string()))?
            }
            MediaType::Video => {
                let path = request.file_path.as_deref().ok_or(ExtractError::FileNotFound)?;
                video::extract(path).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_upload_is_file_not_found() {
        let request = DetectionRequest::file(
            MediaType::Audio,
            "gone.wav",
            "/nonexistent/gone.wav".into(),
            "alice",
        );
        let err = MediaExtractor.extract(&request).await.unwrap_err();
        assert_eq!(err.to_string(), "File not found");

        let video = DetectionRequest::file(
            MediaType::Video,
            "gone.mp4",
            "/nonexistent/gone.mp4".into(),
            "alice",
        );
        assert_eq!(MediaExtractor.extract(&video).await.unwrap_err(), ExtractError::FileNotFound);
    }

    #[tokio::test]
    async fn test_image_has_no_features() {
        let request = DetectionRequest::file(MediaType::Image, "a.png", "/tmp/a.png".into(), "alice");
        assert!(MediaExtractor.extract(&request).await.unwrap().is_empty());
    }
}
