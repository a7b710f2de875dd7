// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{FromRequestParts, OriginalUri, State},
    http::{HeaderMap, Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Name of the cookie carrying the anti-forgery token.
pub const CSRF_COOKIE: &str = "csrftoken";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub username: String,
    /// User's role (e.g., 'user', 'admin').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Claims of an anti-forgery token. Bound to one user.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CsrfClaims {
    pub sub: String,
    /// Always "csrf"; keeps session and CSRF tokens from standing in for each other.
    pub kind: String,
    pub exp: usize,
}

/// The authenticated actor of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;
        Ok(Self {
            id,
            username: claims.username,
            role: claims.role,
        })
    }
}

/// How the session reached us. Only cookie sessions need CSRF protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Bearer,
    Cookie,
}

fn expiry(expiration_seconds: u64) -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize)
}

/// Signs a new session JWT for the user.
pub fn sign_jwt(
    id: i64,
    username: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(), // Store User ID in 'sub' claim
        username: username.to_owned(),
        role: role.to_owned(),
        exp: expiry(expiration_seconds)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a session JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Signs an anti-forgery token for the user.
pub fn sign_csrf_token(id: i64, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    let claims = CsrfClaims {
        sub: id.to_string(),
        kind: "csrf".to_string(),
        exp: expiry(expiration_seconds)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Checks that `token` is a live CSRF token issued to `user_id`.
pub fn verify_csrf_token(token: &str, secret: &str, user_id: i64) -> bool {
    decode::<CsrfClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.kind == "csrf" && data.claims.sub == user_id.to_string())
    .unwrap_or(false)
}

/// Session and CSRF cookies for a fresh login.
///
/// Only the session cookie is `HttpOnly`; scripts need the CSRF one to echo it.
pub fn session_cookies(token: &str, csrf_token: &str, max_age: u64) -> [Cookie<'static>; 2] {
    let max_age = time::Duration::seconds(i64::try_from(max_age).unwrap_or(i64::MAX));
    [
        Cookie::build((SESSION_COOKIE, token.to_owned()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build(),
        Cookie::build((CSRF_COOKIE, csrf_token.to_owned()))
            .path("/")
            .same_site(SameSite::Lax)
            .max_age(max_age)
            .build(),
    ]
}

/// Removal cookies that drop the session.
pub fn expired_cookies() -> [Cookie<'static>; 2] {
    [SESSION_COOKIE, CSRF_COOKIE].map(|name| {
        let mut cookie = Cookie::build((name, "")).path("/").build();
        cookie.make_removal();
        cookie
    })
}

/// Finds the session token: `Authorization: Bearer` first, then the cookie.
fn session_token(headers: &HeaderMap) -> Option<(String, SessionSource)> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match bearer {
        Some(token) => Some((token.to_owned(), SessionSource::Bearer)),
        None => CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .filter(|token| !token.is_empty())
            .map(|token| (token, SessionSource::Cookie)),
    }
}

/// Axum Middleware: Session.
///
/// Resolves the session token (if any) and injects `CurrentUser` plus its
/// `SessionSource` into the request extensions. Never rejects: pages decide
/// for themselves what an anonymous visitor gets.
pub async fn session_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let resolved = session_token(req.headers()).and_then(|(token, source)| {
        match verify_jwt(&token, &config.jwt_secret).and_then(CurrentUser::try_from) {
            Ok(user) => Some((user, source)),
            Err(_) => {
                tracing::debug!("Ignoring invalid session token");
                None
            }
        }
    });

    if let Some((user, source)) = resolved {
        req.extensions_mut().insert(user);
        req.extensions_mut().insert(source);
    }

    next.run(req).await
}

/// Axum Middleware: Authentication (API surfaces).
///
/// Must be used AFTER `session_middleware`. Returns 401 Unauthorized when no
/// valid session was found.
pub async fn auth_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    if req.extensions().get::<CurrentUser>().is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks if the injected `CurrentUser` has 'admin' role.
/// If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !user.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

/// Extractor for pages that require a login: anonymous visitors are
/// redirected to the login page with `next` pointing back here.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| {
                // Nested routers see a stripped URI.
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map(|uri| uri.0.path())
                    .unwrap_or(parts.uri.path());
                AppError::LoginRequired(path.to_string())
            })
    }
}

/// Extractor for pages open to everybody.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().cloned()))
    }
}
