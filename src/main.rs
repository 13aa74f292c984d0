//! Guardian Backend Server
//!
//! Media authenticity detection: uploads and text are checked against
//! third-party AI/deepfake classifiers, with local fallbacks so every request
//! gets a verdict.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GUARDIAN BACKEND                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Auth     │  │  Detection Orchestrator │ │
//! │  │  Gateway  │  │  Service  │  │  providers → heuristic  │ │
//! │  │  (Axum)   │  │  (JWT)    │  │  → simulation           │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ Store (PG)  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod detection;
mod error;
mod handlers;
mod middleware;
mod models;
mod store;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use detection::{MediaExtractor, Orchestrator, ProviderSet};
use store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "guardian_server=debug,tower_http=debug".into());
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Guardian Server starting...");
    if config.is_production() && config.jwt_secret == config::DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET is the development default");
    }

    let configured = config.providers.configured();
    if configured.is_empty() {
        tracing::warn!("No provider credentials configured, detections will use local fallbacks");
    } else {
        tracing::info!("Providers configured: {}", configured.join(", "));
    }

    // Storage
    let store: Arc<dyn Store> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory store, data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));
        let pool = db::create_pool(&config.database_url)
            .await
            .context("Failed to create database pool")?;

        tracing::info!("Running database migrations...");
        db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        Arc::new(PgStore::new(pool))
    };

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    // Detection engine
    let http = detection::providers::build_http_client().context("Failed to build HTTP client")?;
    let providers = ProviderSet::from_credentials(&config.providers, http);
    let orchestrator = Orchestrator::new(providers, Arc::new(MediaExtractor), store.clone());

    // Build application state
    let state = AppState {
        config: config.clone(),
        store,
        orchestrator: Arc::new(orchestrator),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub store: Arc<dyn Store>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/login", post(handlers::auth::login));

    // User routes (JWT auth)
    let user_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/change-password", post(handlers::auth::change_password))

        // Detection
        .route("/check_video", post(handlers::detection::check_video))
        .route("/check_audio", post(handlers::detection::check_audio))
        .route("/check_image", post(handlers::detection::check_image))
        .route("/check_text", post(handlers::detection::check_text))
        .route("/risk_score", post(handlers::detection::risk_score))

        // Dashboard
        .route("/dashboard/logs", get(handlers::dashboard::logs))
        .route("/dashboard/stats", get(handlers::dashboard::stats))
        .route("/dashboard/chart-data", get(handlers::dashboard::chart_data))
        .route("/dashboard/type-stats", get(handlers::dashboard::type_stats))
        .route("/dashboard/feedback", post(handlers::dashboard::feedback))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::{body_json, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_and_health() {
        let (app, _dir) = test_app();

        let root = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(root.status(), StatusCode::OK);
        assert_eq!(body_json(root).await["message"], "Welcome to Guardian API");

        let health = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(health).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["providers"], serde_json::json!([]));
    }
}
