// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        category::{CategoryForm, UpdateCategoryRequest},
        location::{LocationForm, UpdateLocationRequest},
    },
    state::AppState,
};

/// Body of the publish toggles.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub is_published: bool,
}

/// Lists all categories, published or not.
/// Admin only.
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_categories(false).await?))
}

/// Creates a new category.
/// Admin only.
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryForm>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = state.store.create_category(&payload).await.map_err(|e| match e {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("Slug '{}' already exists", payload.slug))
        }
        other => {
            tracing::error!("Failed to create category: {:?}", other);
            other
        }
    })?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Updates a category by ID.
/// Admin only.
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = state
        .store
        .update_category(id, &payload)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Deletes a category by ID. Its posts stay, without a category.
/// Admin only.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete_category(id).await? {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    tracing::info!(category_id = id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_locations(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.store.list_locations(false).await?))
}

pub async fn create_location(
    State(state): State<AppState>,
    Json(payload): Json<LocationForm>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let location = state.store.create_location(&payload).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let location = state
        .store
        .update_location(id, &payload)
        .await?
        .ok_or(AppError::NotFound("Location not found".to_string()))?;

    Ok(Json(location))
}

/// Deletes a location by ID. Its posts stay, without a location.
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.delete_location(id).await? {
        return Err(AppError::NotFound("Location not found".to_string()));
    }

    tracing::info!(location_id = id, "Location deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Publishes or hides any post, regardless of author.
/// Admin only.
pub async fn set_post_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PublishRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.set_post_published(id, payload.is_published).await? {
        return Err(AppError::NotFound("Post not found".to_string()));
    }

    tracing::info!(post_id = id, is_published = payload.is_published, "Post moderated");
    Ok(StatusCode::OK)
}

/// Publishes or hides a comment.
/// Admin only.
pub async fn set_comment_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<PublishRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !state.store.set_comment_published(id, payload.is_published).await? {
        return Err(AppError::NotFound("Comment not found".to_string()));
    }

    tracing::info!(comment_id = id, is_published = payload.is_published, "Comment moderated");
    Ok(StatusCode::OK)
}
