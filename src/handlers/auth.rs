// src/handlers/auth.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{expired_cookies, session_cookies, sign_csrf_token, sign_jwt},
    },
};

#[derive(Debug, Deserialize)]
pub struct NextParams {
    pub next: Option<String>,
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let user = state
        .store
        .create_user(&payload.username, &hashed_password, "user")
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Username '{}' already exists", payload.username))
            }
            other => {
                tracing::error!("Failed to register user: {:?}", other);
                other
            }
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Login form context. `next` is where the client should go afterwards.
pub async fn login_page(Query(params): Query<NextParams>) -> impl IntoResponse {
    Json(json!({
        "form": { "username": "", "password": "" },
        "next": params.next.unwrap_or_else(|| "/".to_string()),
    }))
}

/// Authenticates a user.
///
/// Answers with the session token for API clients and sets the `session` and
/// `csrftoken` cookies for browsers.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = state
        .store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let config = &state.config;
    let token = sign_jwt(
        user.id,
        &user.username,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;
    let csrf_token = sign_csrf_token(user.id, &config.jwt_secret, config.jwt_expiration)?;

    tracing::info!(user_id = user.id, "User logged in");

    let [session_cookie, csrf_cookie] =
        session_cookies(&token, &csrf_token, config.jwt_expiration);

    Ok((
        jar.add(session_cookie).add(csrf_cookie),
        Json(json!({
            "token": token,
            "csrf_token": csrf_token,
            "type": "Bearer",
        })),
    ))
}

/// Drops the session cookies and goes home.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let [session_cookie, csrf_cookie] = expired_cookies();
    (jar.add(session_cookie).add(csrf_cookie), Redirect::to("/"))
}
