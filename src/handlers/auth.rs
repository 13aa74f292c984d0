//! Authentication handlers

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::middleware::auth::CurrentUser;
use crate::models::{ChangePasswordRequest, LoginRequest, SignupRequest, TokenResponse, User};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub exp: usize,  // Expiration timestamp
    pub iat: usize,  // Issued at
}

/// Register a new user
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Json<User>> {
    req.validate()?;

    if state.store.find_user_by_username(&req.username).await?.is_some() {
        return Err(AppError::AlreadyExists("Username already registered".to_string()));
    }
    if state.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::AlreadyExists("Email already registered".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    let user = state
        .store
        .create_user(User::new(req.username, req.email, password_hash))
        .await?;

    tracing::info!("New user registered: {}", user.username);

    Ok(Json(user))
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = state
        .store
        .find_user_by_username(&req.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_jwt(&user, &state.config.jwt_secret, state.config.jwt_expiration_hours)?;

    Ok(Json(TokenResponse::bearer(token)))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<Json<Value>> {
    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(AppError::ValidationError("Incorrect current password".to_string()));
    }
    req.validate()?;

    let password_hash = hash_password(&req.new_password)?;
    state.store.update_password(&user.username, &password_hash).await?;

    Ok(Json(json!({ "message": "Password updated successfully" })))
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(e.to_string()))
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate JWT token
pub fn generate_jwt(user: &User, secret: &str, expiration_hours: u64) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours as i64);

    let claims = Claims {
        sub: user.username.clone(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{body_json, json_request, login_token, test_app};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::body::Body;
    use tower::ServiceExt;

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_signup_login_me() {
        let (app, _dir) = test_app();
        let token = login_token(&app, "alice").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "alice");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let (app, _dir) = test_app();
        login_token(&app, "alice").await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/signup",
                None,
                json!({"username": "alice", "email": "other@example.com", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Username already registered");
    }

    #[tokio::test]
    async fn test_invalid_signup_rejected() {
        let (app, _dir) = test_app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/auth/signup",
                None,
                json!({"username": "al", "email": "nope", "password": "1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let (app, _dir) = test_app();
        login_token(&app, "alice").await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({"username": "alice", "password": "not-it"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Incorrect username or password");
    }

    #[tokio::test]
    async fn test_change_password() {
        let (app, _dir) = test_app();
        let token = login_token(&app, "alice").await;

        let wrong = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/change-password",
                Some(&token),
                json!({"current_password": "bad", "new_password": "newsecret"}),
            ))
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);

        let ok = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/auth/change-password",
                Some(&token),
                json!({"current_password": "password123", "new_password": "newsecret"}),
            ))
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let relogin = app
            .oneshot(json_request(
                Method::POST,
                "/auth/login",
                None,
                json!({"username": "alice", "password": "newsecret"}),
            ))
            .await
            .unwrap();
        assert_eq!(relogin.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let (app, _dir) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let (app, _dir) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/dashboard/stats")
                    .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Could not validate credentials");
    }
}
