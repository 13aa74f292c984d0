//! Dashboard handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::middleware::auth::CurrentUser;
use crate::models::{ChartFilter, ChartPoint, Feedback, FeedbackRequest, LogEntry, UserStats};
use crate::{AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Detection history, newest first
pub async fn logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<LogEntry>>> {
    Ok(Json(state.store.logs_for_user(&user.username).await?))
}

pub async fn stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserStats>> {
    Ok(Json(state.store.user_stats(&user.username).await?))
}

pub async fn chart_data(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ChartQuery>,
) -> AppResult<Json<Vec<ChartPoint>>> {
    let filter = ChartFilter::parse(query.kind.as_deref());
    Ok(Json(state.store.chart_data(&user.username, filter).await?))
}

pub async fn type_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<ChartPoint>>> {
    Ok(Json(state.store.type_stats(&user.username).await?))
}

pub async fn feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<Json<Value>> {
    req.validate()?;
    state
        .store
        .append_feedback(Feedback::new(&user.username, req.message))
        .await?;

    Ok(Json(json!({ "message": "Feedback received" })))
}
