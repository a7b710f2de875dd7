use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'locations' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a location (admin).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationForm {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

/// DTO for updating a location. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,
    pub is_published: Option<bool>,
}

fn default_published() -> bool {
    true
}
