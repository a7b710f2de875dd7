// src/error.rs

use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::fmt;
use validator::{ValidationError, ValidationErrors};

use crate::config::LOGIN_URL;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
///
/// Authorization failures on blog pages are not error pages: they map to
/// redirects so the visitor always lands on something navigable.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request, form redisplayed with per-field errors
    Validation(ValidationErrors),

    // 401 Unauthorized (API surfaces and failed logins)
    AuthError(String),

    // 403 Forbidden (admin API only)
    Forbidden(String),

    // 403, anti-forgery token missing or invalid
    CsrfFailure(String),

    // 404 Not Found. Also used for entities that exist but are hidden.
    NotFound(String),

    // 409 Conflict (e.g., duplicate username)
    Conflict(String),

    // 303 to the login page; carries the path to come back to
    LoginRequired(String),

    // 303 to a read-only view, for authenticated non-owners
    RedirectAway(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Builds `/auth/login?next=<path>`.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_URL, encoded)
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON page (or a redirect) with the matching status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::LoginRequired(next) => {
                return Redirect::to(&login_url(&next)).into_response();
            }
            AppError::RedirectAway(url) => {
                tracing::debug!("Redirecting non-owner to {}", url);
                return Redirect::to(&url).into_response();
            }
            AppError::Validation(errors) => {
                let body = Json(json!({
                    "error": "Validation failed",
                    "errors": errors,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::CsrfFailure(reason) => {
                tracing::warn!("CSRF verification failed: {}", reason);
                let body = Json(json!({
                    "error": "CSRF verification failed. Request aborted.",
                    "reason": reason,
                    "template": "pages/403csrf.html",
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                let body = Json(json!({
                    "error": "Internal Server Error",
                    "template": "pages/500.html",
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
            AppError::NotFound(msg) => {
                let body = Json(json!({
                    "error": msg,
                    "template": "pages/404.html",
                }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            // Postgres error code for unique violation is 23505
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict(db_err.message().to_string());
            }
        }
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// An unreadable form body is reported like any other invalid form,
/// under the non-field key.
fn invalid_body(reason: String) -> AppError {
    let mut error = ValidationError::new("invalid_body");
    error.message = Some(reason.into());
    let mut errors = ValidationErrors::new();
    errors.add("__all__", error);
    AppError::Validation(errors)
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        invalid_body(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        invalid_body(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        invalid_body(err.body_text())
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Page not found".to_string())
}
