use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::AppError,
    models::{
        post::PageParams,
        user::{ProfileForm, ProfileResponse, User},
    },
    state::AppState,
    store::{PostQuery, paginate_posts},
    utils::{
        jwt::{CurrentUser, MaybeUser},
        urls,
    },
};

/// Session claims carry the username from login time; the store has the current one.
async fn load_current(state: &AppState, user: &CurrentUser) -> Result<User, AppError> {
    state
        .store
        .find_user(user.id)
        .await?
        .ok_or(AppError::AuthError("Unknown user".to_string()))
}

/// A user's public page with their posts.
/// The owner sees drafts and scheduled posts too; everybody else only live ones.
pub async fn view_profile(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let query = PostQuery::new()
        .visible_to(viewer.id(), Utc::now())
        .by_author(user.id);
    let page = paginate_posts(
        state.store.as_ref(),
        &query,
        state.config.posts_per_page,
        params.page.as_deref(),
    )
    .await?;

    let is_owner = viewer.id() == Some(user.id);

    Ok(Json(json!({
        "profile": ProfileResponse::from(user),
        "is_owner": is_owner,
        "page_obj": page,
    })))
}

/// `/profile` -> `/profile/{username}` of the logged-in user.
pub async fn own_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, AppError> {
    let user = load_current(&state, &user).await?;
    Ok(Redirect::to(&urls::profile(&user.username)).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let user = load_current(&state, &user).await?;
    Ok(Json(json!({ "form": ProfileForm::from(&user) })))
}

/// Update the logged-in user's own profile. There is no way to edit somebody else's.
pub async fn edit_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(mut payload) = payload?;
    payload.first_name = payload.first_name.trim().to_string();
    payload.last_name = payload.last_name.trim().to_string();
    payload.username = payload.username.trim().to_string();
    payload.email = payload
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    payload.validate()?;

    let updated = match state.store.update_profile(user.id, &payload).await {
        Ok(updated) => updated,
        Err(AppError::Conflict(_)) => {
            let mut error = ValidationError::new("unique");
            error.message = Some("A user with that username already exists.".into());
            let mut errors = ValidationErrors::new();
            errors.add("username", error);
            return Err(AppError::Validation(errors));
        }
        Err(e) => return Err(e),
    };

    tracing::info!(user_id = updated.id, username = %updated.username, "Profile updated");

    Ok(Redirect::to(&urls::profile(&updated.username)).into_response())
}
