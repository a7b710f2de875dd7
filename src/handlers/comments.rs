// src/handlers/comments.rs

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{Comment, CommentForm},
    policy::{Action, authorize},
    state::AppState,
    store::BlogStore,
    utils::{
        html::clean_html,
        jwt::{CurrentUser, MaybeUser},
        urls,
    },
};

/// The comment must belong to the post named in the path.
async fn find_comment_or_404(
    store: &dyn BlogStore,
    post_id: i64,
    comment_id: i64,
) -> Result<Comment, AppError> {
    store
        .find_comment(post_id, comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

fn clean_comment(mut form: CommentForm) -> Result<CommentForm, AppError> {
    form.text = clean_html(&form.text);
    form.validate()?;
    Ok(form)
}

/// Add a comment to a post the user can see.
pub async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    payload: Result<Json<CommentForm>, JsonRejection>,
) -> Result<Response, AppError> {
    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    authorize(Some(&user), &post, Action::Comment { now: Utc::now() }).into_result()?;

    let Json(payload) = payload?;
    let form = clean_comment(payload)?;
    let comment = state.store.create_comment(post.id, user.id, &form.text).await?;
    tracing::info!(comment_id = comment.id, post_id = post.id, "Comment added");

    Ok(Redirect::to(&urls::post_detail(post.id)).into_response())
}

/// Context for the comment edit form. Author only.
pub async fn edit_form(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let comment = find_comment_or_404(state.store.as_ref(), post_id, comment_id).await?;
    authorize(viewer.user(), &comment, Action::Edit).into_result()?;

    Ok(Json(json!({
        "form": { "text": comment.text },
        "comment": comment,
    })))
}

/// Update a comment. Author only; the body is not read before that check.
pub async fn edit_comment(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    payload: Result<Json<CommentForm>, JsonRejection>,
) -> Result<Response, AppError> {
    let comment = find_comment_or_404(state.store.as_ref(), post_id, comment_id).await?;
    authorize(viewer.user(), &comment, Action::Edit).into_result()?;

    let Json(payload) = payload?;
    let form = clean_comment(payload)?;
    state.store.update_comment(comment.id, &form.text).await?;
    tracing::info!(comment_id = comment.id, "Comment updated");

    Ok(Redirect::to(&urls::post_detail(comment.post_id)).into_response())
}

/// Delete a comment. Author only; anybody else is sent back to the post.
pub async fn delete_comment(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<Response, AppError> {
    let comment = find_comment_or_404(state.store.as_ref(), post_id, comment_id).await?;
    authorize(viewer.user(), &comment, Action::Delete).into_result()?;

    state.store.delete_comment(comment.id).await?;
    tracing::info!(comment_id = comment.id, "Comment deleted");

    Ok(Redirect::to(&urls::post_detail(comment.post_id)).into_response())
}
