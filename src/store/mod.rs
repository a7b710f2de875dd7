//! Persistence collaborator.
//!
//! Handlers never talk to a database directly. They describe what they want
//! as a [`PostQuery`] (filter steps), let the store count and fetch one page
//! of it in the fixed listing order, and annotate that page with comment
//! counts in one aggregate call.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        category::{Category, CategoryForm, UpdateCategoryRequest},
        comment::{Comment, CommentResponse},
        location::{Location, LocationForm, UpdateLocationRequest},
        post::{PostForm, PostRow},
        user::{ProfileForm, User},
    },
    policy::{Page, PageWindow, Paginator, Visibility},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Filter steps of a post listing. Ordering is not part of the query: every
/// store returns posts by `pub_date DESC, id DESC`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostQuery {
    pub visibility: Option<Visibility>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
}

impl PostQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only posts `viewer` may see at `now`.
    pub fn visible_to(mut self, viewer: Option<i64>, now: DateTime<Utc>) -> Self {
        self.visibility = Some(Visibility::new(viewer, now));
        self
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn by_author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    /// Evaluates the filters against one row.
    pub fn matches(&self, post: &PostRow) -> bool {
        self.visibility.is_none_or(|v| v.admits(post))
            && self.category_id.is_none_or(|id| post.category_id == Some(id))
            && self.author_id.is_none_or(|id| post.author_id == id)
    }
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    // Users
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(&self, id: i64, form: &ProfileForm) -> Result<User, AppError>;

    // Categories
    async fn list_categories(&self, published_only: bool) -> Result<Vec<Category>, AppError>;
    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError>;
    async fn create_category(&self, form: &CategoryForm) -> Result<Category, AppError>;
    async fn update_category(&self, id: i64, changes: &UpdateCategoryRequest) -> Result<Option<Category>, AppError>;
    /// Posts of the category keep existing with no category.
    async fn delete_category(&self, id: i64) -> Result<bool, AppError>;

    // Locations
    async fn list_locations(&self, published_only: bool) -> Result<Vec<Location>, AppError>;
    async fn find_location(&self, id: i64) -> Result<Option<Location>, AppError>;
    async fn create_location(&self, form: &LocationForm) -> Result<Location, AppError>;
    async fn update_location(&self, id: i64, changes: &UpdateLocationRequest) -> Result<Option<Location>, AppError>;
    /// Posts at the location keep existing with no location.
    async fn delete_location(&self, id: i64) -> Result<bool, AppError>;

    // Posts
    async fn count_posts(&self, query: &PostQuery) -> Result<i64, AppError>;
    async fn fetch_posts(&self, query: &PostQuery, window: PageWindow) -> Result<Vec<PostRow>, AppError>;
    /// Unfiltered lookup; callers apply visibility or ownership themselves.
    async fn find_post(&self, id: i64) -> Result<Option<PostRow>, AppError>;
    async fn create_post(&self, author_id: i64, form: &PostForm) -> Result<i64, AppError>;
    async fn update_post(&self, id: i64, form: &PostForm) -> Result<(), AppError>;
    /// Removes the post together with its comments.
    async fn delete_post(&self, id: i64) -> Result<(), AppError>;
    async fn set_post_published(&self, id: i64, published: bool) -> Result<bool, AppError>;
    /// One aggregate over the given posts. Posts without comments are absent.
    async fn comment_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError>;

    // Comments
    /// Oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentResponse>, AppError>;
    async fn find_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, AppError>;
    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment, AppError>;
    async fn update_comment(&self, id: i64, text: &str) -> Result<(), AppError>;
    async fn delete_comment(&self, id: i64) -> Result<(), AppError>;
    async fn set_comment_published(&self, id: i64, published: bool) -> Result<bool, AppError>;
}

/// Fills `comment_count` on every row with a single aggregate call.
pub async fn annotate_comment_counts(
    store: &dyn BlogStore,
    mut rows: Vec<PostRow>,
) -> Result<Vec<PostRow>, AppError> {
    if rows.is_empty() {
        return Ok(rows);
    }

    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let counts = store.comment_counts(&ids).await?;

    for row in &mut rows {
        row.comment_count = counts.get(&row.id).copied().unwrap_or(0);
    }
    Ok(rows)
}

/// count -> clamp page -> fetch page -> annotate.
pub async fn paginate_posts(
    store: &dyn BlogStore,
    query: &PostQuery,
    per_page: i64,
    requested_page: Option<&str>,
) -> Result<Page<PostRow>, AppError> {
    let total = store.count_posts(query).await?;
    let paginator = Paginator::new(total, per_page);
    let window = paginator.window(requested_page);

    let rows = store.fetch_posts(query, window).await?;
    let rows = annotate_comment_counts(store, rows).await?;

    tracing::debug!(
        total,
        page = window.number,
        rows = rows.len(),
        "Paginated post listing"
    );

    Ok(Page::new(&paginator, window, rows))
}
