//! Detection handlers
//!
//! Uploads are written under `UPLOAD_DIR` as `<uuid>_<sanitised name>`; the
//! original file name is what gets logged. Detection itself never fails: a
//! well-formed request always gets a verdict.

use axum::{
    extract::{Multipart, State},
    Form, Json,
};
use serde::Deserialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::detection::{DetectionRequest, MediaType, Verdict};
use crate::middleware::auth::CurrentUser;
use crate::models::{RiskAssessment, RiskReport, RiskRequest};
use crate::{AppError, AppResult, AppState};

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct TextForm {
    pub text: String,
}

/// Keep only the final path component and a conservative character set
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Persist the `file` field; returns (original name, stored path)
async fn save_upload(state: &AppState, mut multipart: Multipart) -> AppResult<(String, PathBuf)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;

        tokio::fs::create_dir_all(&state.config.upload_dir).await?;
        let path = state
            .config
            .upload_dir
            .join(format!("{}_{}", Uuid::new_v4(), sanitize_filename(&original)));
        tokio::fs::write(&path, &data).await?;

        tracing::debug!(file = %path.display(), bytes = data.len(), "Upload stored");
        return Ok((original, path));
    }

    Err(AppError::PayloadError("Missing file field".to_string()))
}

async fn detect_upload(
    state: AppState,
    user: CurrentUser,
    multipart: Multipart,
    media: MediaType,
) -> AppResult<Json<Verdict>> {
    let (original, path) = save_upload(&state, multipart).await?;
    let request = DetectionRequest::file(media, original, path, user.0.username);
    Ok(Json(state.orchestrator.detect(request).await))
}

pub async fn check_video(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<Verdict>> {
    detect_upload(state, user, multipart, MediaType::Video).await
}

pub async fn check_audio(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<Verdict>> {
    detect_upload(state, user, multipart, MediaType::Audio).await
}

pub async fn check_image(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<Verdict>> {
    detect_upload(state, user, multipart, MediaType::Image).await
}

pub async fn check_text(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<TextForm>,
) -> AppResult<Json<Verdict>> {
    if form.text.trim().is_empty() {
        return Err(AppError::ValidationError("Text cannot be empty".to_string()));
    }

    let request = DetectionRequest::text(form.text, user.username);
    Ok(Json(state.orchestrator.detect(request).await))
}

pub async fn risk_score(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<RiskRequest>,
) -> AppResult<Json<RiskAssessment>> {
    let assessment = RiskAssessment::from_confidences(&req.confidences)
        .ok_or_else(|| AppError::ValidationError("Confidences list cannot be empty".to_string()))?;

    state
        .store
        .append_risk_report(RiskReport::new(&user.username, req.confidences, &assessment))
        .await?;

    Ok(Json(assessment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::simulation;
    use crate::handlers::test_support::{body_json, json_request, login_token, test_app_with_store};
    use crate::store::{MemoryStore, Store};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::json;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "guardian-test-boundary";

    fn multipart_request(uri: &str, token: &str, field: &str, filename: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("C:\\Users\\x\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[tokio::test]
    async fn test_check_image_without_providers_is_simulated() {
        let store = Arc::new(MemoryStore::new());
        let (app, dir) = test_app_with_store(store.clone());
        let token = login_token(&app, "alice").await;
        let bytes = b"\x89PNG\r\n\x1a\n fake png payload";

        let response = app
            .oneshot(multipart_request("/check_image", &token, "file", "cat.png", bytes))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let expected = simulation::simulate(&bytes.len().to_string());
        assert_eq!(body["result"], expected.result);
        assert_eq!(body["confidence"], expected.confidence);

        let logs = store.logs_for_user("alice").await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].input_data, "cat.png");
        assert_eq!(logs[0].request_type, "image");

        let stored: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_video_reports_analysis_error() {
        let (app, _dir) = test_app_with_store(Arc::new(MemoryStore::new()));
        let token = login_token(&app, "alice").await;

        let response = app
            .oneshot(multipart_request("/check_video", &token, "file", "clip.mp4", b"not a video"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["result"], "Analysis Error: Could not open video file");
        assert_eq!(body["confidence"], 0.0);
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let (app, _dir) = test_app_with_store(Arc::new(MemoryStore::new()));
        let token = login_token(&app, "alice").await;

        let response = app
            .oneshot(multipart_request("/check_audio", &token, "attachment", "v.wav", b"RIFF"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_check_text() {
        let (app, _dir) = test_app_with_store(Arc::new(MemoryStore::new()));
        let token = login_token(&app, "alice").await;

        let request = |text: &str| {
            Request::builder()
                .method(Method::POST)
                .uri("/check_text")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("text={}", text)))
                .unwrap()
        };

        let response = app.clone().oneshot(request("hello+world")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"], simulation::simulate("hello world").result);

        let empty = app.oneshot(request("+++")).await.unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_risk_score() {
        let store = Arc::new(MemoryStore::new());
        let (app, _dir) = test_app_with_store(store.clone());
        let token = login_token(&app, "alice").await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/risk_score",
                Some(&token),
                json!({"confidences": [0.9, 0.95, 0.85]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["risk_level"], "High");
        assert!((body["average_confidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
        assert_eq!(store.risk_reports().await.len(), 1);

        let empty = app
            .oneshot(json_request(Method::POST, "/risk_score", Some(&token), json!({"confidences": []})))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(empty).await["error"], "Confidences list cannot be empty");
        assert_eq!(store.risk_reports().await.len(), 1);
    }
}
