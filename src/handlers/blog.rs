// src/handlers/blog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::{
    error::AppError,
    models::post::PageParams,
    policy::is_visible,
    state::AppState,
    store::{PostQuery, paginate_posts},
    utils::jwt::MaybeUser,
};

/// Home page: every post the viewer may see, newest first.
pub async fn index(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let query = PostQuery::new().visible_to(viewer.id(), Utc::now());
    let page = paginate_posts(
        state.store.as_ref(),
        &query,
        state.config.posts_per_page,
        params.page.as_deref(),
    )
    .await?;

    Ok(Json(json!({ "page_obj": page })))
}

/// Single post with its comments.
/// Hidden posts answer exactly like missing ones.
pub async fn post_detail(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = state
        .store
        .find_post(post_id)
        .await?
        .filter(|post| is_visible(post, viewer.id(), Utc::now()))
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let comments = state.store.list_comments(post.id).await?;

    // Only logged-in visitors get a comment form.
    let form = viewer.user().map(|_| json!({ "text": "" }));

    Ok(Json(json!({
        "post": post,
        "comments": comments,
        "form": form,
    })))
}

/// Posts of one published category.
pub async fn category_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let category = state
        .store
        .find_category_by_slug(&slug)
        .await?
        .filter(|category| category.is_published)
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    let query = PostQuery::new()
        .visible_to(viewer.id(), Utc::now())
        .in_category(category.id);
    let page = paginate_posts(
        state.store.as_ref(),
        &query,
        state.config.posts_per_page,
        params.page.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "category": category,
        "page_obj": page,
    })))
}
