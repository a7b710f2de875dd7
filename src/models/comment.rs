use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating or editing a comment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Comment must be between 1 and 10000 characters"
    ))]
    #[serde(default)]
    pub text: String,
}

/// DTO for displaying a comment with author info.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
