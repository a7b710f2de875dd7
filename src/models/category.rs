use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("slug pattern is valid"));

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL identifier, unique across categories.
    pub slug: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a category (admin).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryForm {
    #[validate(length(min = 1, max = 256))]
    pub title: String,
    #[validate(length(max = 20000))]
    pub description: String,
    #[validate(length(min = 1, max = 64), custom(function = validate_slug))]
    pub slug: String,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

/// DTO for updating a category. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 256))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 64), custom(function = validate_slug))]
    pub slug: Option<String>,
    pub is_published: Option<bool>,
}

fn default_published() -> bool {
    true
}

/// Latin letters, digits, hyphen and underscore only.
fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(validator::ValidationError::new("invalid_slug"));
    }
    Ok(())
}
