// src/handlers/posts.rs

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::AppError,
    models::post::{PostForm, PostRow},
    notify::{Notice, notify_in_background},
    policy::{Action, authorize},
    state::AppState,
    store::BlogStore,
    utils::{
        html::clean_html,
        jwt::{CurrentUser, MaybeUser},
        upload::{ImageUpload, PostSubmission, save_post_image},
        urls,
    },
};

fn invalid_choice() -> ValidationError {
    let mut error = ValidationError::new("invalid_choice");
    error.message = Some("Select a valid choice.".into());
    error
}

/// Sanitizes the form, then runs field validation plus the checks that need
/// the store (referenced category and location must exist).
async fn prepare_post_form(
    store: &dyn BlogStore,
    mut form: PostForm,
    upload: Option<&ImageUpload>,
) -> Result<PostForm, AppError> {
    form.title = form.title.trim().to_string();
    form.text = clean_html(&form.text);
    form.image = form.image.filter(|image| !image.trim().is_empty());

    let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);

    if let Some(Err(error)) = upload.map(ImageUpload::check) {
        errors.add("image", error);
    }

    if let Some(category_id) = form.category_id {
        if store.find_category(category_id).await?.is_none() {
            errors.add("category_id", invalid_choice());
        }
    }

    if let Some(location_id) = form.location_id {
        if store.find_location(location_id).await?.is_none() {
            errors.add("location_id", invalid_choice());
        }
    }

    if !errors.errors().is_empty() {
        return Err(AppError::Validation(errors));
    }
    Ok(form)
}

/// Owner-only lookups start here: a missing post is a 404 for everybody.
async fn find_post_or_404(store: &dyn BlogStore, post_id: i64) -> Result<PostRow, AppError> {
    store
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))
}

/// Context for the "new post" form.
pub async fn create_form(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let categories = state.store.list_categories(true).await?;
    let locations = state.store.list_locations(true).await?;

    Ok(Json(json!({
        "form": null,
        "categories": categories,
        "locations": locations,
    })))
}

/// Validates the submission and stores its image, if one was uploaded.
async fn accept_submission(state: &AppState, submission: PostSubmission) -> Result<PostForm, AppError> {
    let PostSubmission { form, upload, .. } = submission;
    let mut form = prepare_post_form(state.store.as_ref(), form, upload.as_ref()).await?;

    if let Some(upload) = &upload {
        form.image = Some(save_post_image(&state.config.media_root, upload).await?);
    }
    Ok(form)
}

/// Create a new post from JSON or a multipart form with an optional image.
/// The author is always the logged-in user. Redirects to the author's profile.
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<PostSubmission, AppError>,
) -> Result<Response, AppError> {
    let form = accept_submission(&state, payload?).await?;

    // The token may predate a username change.
    let author = state
        .store
        .find_user(user.id)
        .await?
        .ok_or(AppError::AuthError("Unknown user".to_string()))?;

    let post_id = state.store.create_post(author.id, &form).await?;
    tracing::info!(post_id, author = %author.username, "Post created");

    notify_in_background(
        state.notifier.clone(),
        Notice::new_post(&state.config, &form.title, &author.username),
    );

    Ok(Redirect::to(&urls::profile(&author.username)).into_response())
}

/// Context for the edit form. Owner only.
pub async fn edit_form(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = find_post_or_404(state.store.as_ref(), post_id).await?;
    authorize(viewer.user(), &post, Action::Edit).into_result()?;

    let categories = state.store.list_categories(true).await?;
    let locations = state.store.list_locations(true).await?;

    Ok(Json(json!({
        "form": PostForm::from(&post),
        "post": post,
        "categories": categories,
        "locations": locations,
    })))
}

/// Update a post. Owner only; anybody else lands on the post page unchanged.
pub async fn edit_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
    payload: Result<PostSubmission, AppError>,
) -> Result<Response, AppError> {
    let post = find_post_or_404(state.store.as_ref(), post_id).await?;
    authorize(viewer.user(), &post, Action::Edit).into_result()?;

    let mut submission = payload?;
    if submission.keep_image {
        submission.form.image = post.image.clone();
    }
    let form = accept_submission(&state, submission).await?;
    state.store.update_post(post.id, &form).await?;
    tracing::info!(post_id = post.id, "Post updated");

    Ok(Redirect::to(&urls::post_detail(post.id)).into_response())
}

/// Context for the delete confirmation page. Owner only.
pub async fn delete_form(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = find_post_or_404(state.store.as_ref(), post_id).await?;
    authorize(viewer.user(), &post, Action::Delete).into_result()?;

    Ok(Json(json!({
        "form": { "instance": post },
    })))
}

/// Delete a post together with its comments. Owner only.
pub async fn delete_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<Response, AppError> {
    let post = find_post_or_404(state.store.as_ref(), post_id).await?;
    authorize(viewer.user(), &post, Action::Delete).into_result()?;

    state.store.delete_post(post.id).await?;
    tracing::info!(post_id = post.id, "Post deleted");

    // The actor is the author here.
    Ok(Redirect::to(&urls::profile(&post.author_username)).into_response())
}
