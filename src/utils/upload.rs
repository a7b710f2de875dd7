// src/utils/upload.rs

//! Post form bodies (JSON or `multipart/form-data`) and image uploads.

use std::path::Path;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::{error::AppError, models::post::PostForm};

/// Subdirectory of the media root that holds post images.
pub const POST_IMAGES_DIR: &str = "post_images";

const IMAGE_EXTENSIONS: [&str; 5] = ["gif", "jpeg", "jpg", "png", "webp"];

/// A file sent in the `image` part of a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    /// Lowercased extension, if it names a supported image format.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    pub fn check(&self) -> Result<(), ValidationError> {
        if self.extension().is_none() {
            return Err(field_error(
                "invalid_image",
                "Upload a valid image. Allowed formats: gif, jpeg, jpg, png, webp.",
            ));
        }
        if self.bytes.is_empty() {
            return Err(field_error("empty", "The submitted file is empty."));
        }
        Ok(())
    }
}

/// Writes the upload to `{media_root}/post_images/<uuid>.<ext>` and returns
/// the path relative to the media root.
pub async fn save_post_image(media_root: &str, upload: &ImageUpload) -> Result<String, AppError> {
    let extension = upload
        .extension()
        .ok_or(AppError::BadRequest("Unsupported image format".to_string()))?;

    let dir = Path::new(media_root).join(POST_IMAGES_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to create {:?}: {}", dir, e)))?;

    let name = format!("{}.{}", Uuid::new_v4(), extension);
    tokio::fs::write(dir.join(&name), &upload.bytes)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to store image: {}", e)))?;

    tracing::info!(file = %name, bytes = upload.bytes.len(), "Stored post image");
    Ok(format!("{}/{}", POST_IMAGES_DIR, name))
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Accepts RFC 3339 and the `datetime-local` input format (read as UTC).
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                .ok()
                .map(|date| date.and_utc())
        })
}

/// An empty select means "none".
fn parse_choice(raw: &str) -> Result<Option<i64>, ValidationError> {
    match raw.trim() {
        "" => Ok(None),
        raw => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| field_error("invalid_choice", "Select a valid choice.")),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "on" | "true" | "True")
}

/// The body of a post create or edit request.
///
/// Handlers take it as `Result<PostSubmission, AppError>` so that an
/// unreadable body is only reported once the actor may edit the post.
#[derive(Debug)]
pub struct PostSubmission {
    pub form: PostForm,
    pub upload: Option<ImageUpload>,
    /// A multipart edit that neither sent a file nor cleared the image
    /// leaves the stored one alone.
    pub keep_image: bool,
}

impl PostSubmission {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PostForm::default();
        let mut upload = None;
        let mut image_sent = false;
        let mut clear_image = false;
        let mut errors = ValidationErrors::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                match field.file_name().map(str::to_string) {
                    // Browsers send an empty part when no file was chosen.
                    Some(file_name) if file_name.is_empty() => {}
                    Some(file_name) => {
                        let bytes = field.bytes().await?;
                        upload = Some(ImageUpload { file_name, bytes });
                        image_sent = true;
                    }
                    None => {
                        let value = field.text().await?;
                        form.image = Some(value).filter(|v| !v.trim().is_empty());
                        image_sent = true;
                    }
                }
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "title" => form.title = value,
                "text" => form.text = value,
                "pub_date" => match parse_pub_date(value.trim()) {
                    Some(date) => form.pub_date = Some(date),
                    None if value.trim().is_empty() => {}
                    None => errors.add(
                        "pub_date",
                        field_error("invalid", "Enter a valid date/time."),
                    ),
                },
                "category_id" => match parse_choice(&value) {
                    Ok(id) => form.category_id = id,
                    Err(error) => errors.add("category_id", error),
                },
                "location_id" => match parse_choice(&value) {
                    Ok(id) => form.location_id = id,
                    Err(error) => errors.add("location_id", error),
                },
                "is_published" => form.is_published = parse_flag(&value),
                "image-clear" => clear_image = parse_flag(&value),
                _ => {}
            }
        }

        if !errors.errors().is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(Self {
            form,
            upload,
            keep_image: !image_sent && !clear_image,
        })
    }
}

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            return Self::from_multipart(multipart).await;
        }

        let Json(form) = Json::<PostForm>::from_request(req, state).await?;
        Ok(Self {
            form,
            upload: None,
            keep_image: false,
        })
    }
}
