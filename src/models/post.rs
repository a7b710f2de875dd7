use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// A row of the 'posts' table joined with its author, category and location.
///
/// This is what every post view works with. The visibility predicate needs
/// `category_is_published`, so listings and detail lookups share one shape.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,

    pub author_id: i64,
    pub author_username: String,

    pub category_id: Option<i64>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    /// `None` when the post has no category.
    pub category_is_published: Option<bool>,

    pub location_id: Option<i64>,
    /// Withheld when the location is unpublished.
    pub location_name: Option<String>,

    /// Filled by the annotate step; zero until then.
    #[sqlx(default)]
    #[serde(default)]
    pub comment_count: i64,
}

/// DTO for creating or editing a post.
///
/// Missing fields take their `Default` so that they surface as field errors
/// from `validate` instead of a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(length(
        min = 1,
        max = 256,
        message = "Title length must be between 1 and 256 chars"
    ))]
    pub title: String,

    #[validate(length(min = 1, message = "Text must not be empty"))]
    pub text: String,

    /// Relative media path or absolute URL.
    #[validate(length(max = 500), custom(function = validate_image_ref))]
    pub image: Option<String>,

    /// A date in the future schedules the post.
    #[validate(required(message = "This field is required."))]
    pub pub_date: Option<DateTime<Utc>>,

    pub location_id: Option<i64>,
    pub category_id: Option<i64>,

    pub is_published: bool,
}

impl Default for PostForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            image: None,
            pub_date: None,
            location_id: None,
            category_id: None,
            is_published: true,
        }
    }
}

/// Accepts either an absolute URL or a path under the media root.
fn validate_image_ref(image: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(image).is_ok() {
        return Ok(());
    }
    if image.is_empty() || image.starts_with('/') || image.contains("..") {
        return Err(validator::ValidationError::new("invalid_image"));
    }
    Ok(())
}

impl From<&PostRow> for PostForm {
    fn from(post: &PostRow) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            image: post.image.clone(),
            pub_date: Some(post.pub_date),
            location_id: post.location_id,
            category_id: post.category_id,
            is_published: post.is_published,
        }
    }
}

/// Query parameters for paginated listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Raw page number; anything that is not an integer means page 1.
    pub page: Option<String>,
}
