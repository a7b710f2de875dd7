// src/utils/csrf.rs

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    config::Config,
    error::AppError,
    utils::jwt::{CurrentUser, SessionSource, verify_csrf_token},
};

/// Header that must echo the `csrftoken` cookie on state-changing requests.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Axum Middleware: anti-forgery check.
///
/// Must be used AFTER `session_middleware`. Only sessions carried by the
/// cookie are at risk (a browser attaches it to cross-site submissions), so
/// bearer-token and anonymous requests pass untouched.
pub async fn csrf_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if req.method().is_safe() {
        return Ok(next.run(req).await);
    }

    if req.extensions().get::<SessionSource>() != Some(&SessionSource::Cookie) {
        return Ok(next.run(req).await);
    }

    let user_id = req
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.id)
        .ok_or_else(|| AppError::CsrfFailure("Session missing.".to_string()))?;

    let token = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::CsrfFailure("CSRF token missing.".to_string()))?;

    if !verify_csrf_token(token, &config.jwt_secret, user_id) {
        return Err(AppError::CsrfFailure("CSRF token incorrect.".to_string()));
    }

    Ok(next.run(req).await)
}
