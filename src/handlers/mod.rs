//! HTTP handlers

pub mod auth;
pub mod dashboard;
pub mod detection;
pub mod health;

#[cfg(test)]
pub(crate) mod test_support {
    //! Router fixtures backed by `MemoryStore` and unconfigured providers

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::detection::{MediaExtractor, Orchestrator, ProviderSet};
    use crate::store::{MemoryStore, Store};
    use crate::{create_router, AppState};

    pub fn test_app() -> (Router, TempDir) {
        test_app_with_store(Arc::new(MemoryStore::new()))
    }

    /// Returned `TempDir` is the upload directory; keep it alive for the test
    pub fn test_app_with_store(store: Arc<dyn Store>) -> (Router, TempDir) {
        let uploads = tempfile::tempdir().unwrap();
        let config = Config::for_tests(uploads.path().to_path_buf());
        let providers = ProviderSet::from_credentials(&config.providers, reqwest::Client::new());
        let orchestrator = Orchestrator::new(providers, Arc::new(MediaExtractor), store.clone());

        let state = AppState {
            config,
            store,
            orchestrator: Arc::new(orchestrator),
        };
        (create_router(state), uploads)
    }

    pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sign `username` up with password `password123` and return a bearer token
    pub async fn login_token(app: &Router, username: &str) -> String {
        let signup = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/signup",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "password123"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(signup.status(), StatusCode::OK);

        let login = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({"username": username, "password": "password123"}),
            ))
            .await
            .unwrap();
        assert_eq!(login.status(), StatusCode::OK);

        let body = body_json(login).await;
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }
}
