//! In-memory store.
//!
//! Backs the test-suite and `DATABASE_URL=memory://` demo runs. It mirrors
//! the PostgreSQL schema rules: unique usernames and slugs, comments cascade
//! with their post, categories and locations are nullified on posts.
//! Note: Data is lost on process restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        category::{Category, CategoryForm, UpdateCategoryRequest},
        comment::{Comment, CommentResponse},
        location::{Location, LocationForm, UpdateLocationRequest},
        post::{PostForm, PostRow},
        user::{ProfileForm, User},
    },
    policy::PageWindow,
    store::{BlogStore, PostQuery},
};

/// A post as stored, before joins.
#[derive(Debug, Clone)]
struct PostRecord {
    id: i64,
    title: String,
    text: String,
    image: Option<String>,
    pub_date: DateTime<Utc>,
    author_id: i64,
    location_id: Option<i64>,
    category_id: Option<i64>,
    is_published: bool,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    locations: BTreeMap<i64, Location>,
    posts: BTreeMap<i64, PostRecord>,
    comments: BTreeMap<i64, Comment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Same shape as the SQL join in the PostgreSQL store.
    fn join(&self, post: &PostRecord) -> Option<PostRow> {
        let author = self.users.get(&post.author_id)?;
        let category = post.category_id.and_then(|id| self.categories.get(&id));
        let location = post.location_id.and_then(|id| self.locations.get(&id));

        Some(PostRow {
            id: post.id,
            title: post.title.clone(),
            text: post.text.clone(),
            image: post.image.clone(),
            pub_date: post.pub_date,
            is_published: post.is_published,
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: author.username.clone(),
            category_id: post.category_id,
            category_title: category.map(|c| c.title.clone()),
            category_slug: category.map(|c| c.slug.clone()),
            category_is_published: category.map(|c| c.is_published),
            location_id: post.location_id,
            location_name: location.filter(|l| l.is_published).map(|l| l.name.clone()),
            comment_count: 0,
        })
    }

    /// Filtered rows in listing order.
    fn select(&self, query: &PostQuery) -> Vec<PostRow> {
        let mut rows: Vec<PostRow> = self
            .posts
            .values()
            .filter_map(|post| self.join(post))
            .filter(|row| query.matches(row))
            .collect();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        rows
    }

    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.categories
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(username, None) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
        }

        let user = User {
            id: tables.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_profile(&self, id: i64, form: &ProfileForm) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.username_taken(&form.username, Some(id)) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", form.username)));
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or(AppError::NotFound("User not found".to_string()))?;
        user.first_name = form.first_name.clone();
        user.last_name = form.last_name.clone();
        user.email = form.email.clone().unwrap_or_default();
        user.username = form.username.clone();
        Ok(user.clone())
    }

    async fn list_categories(&self, published_only: bool) -> Result<Vec<Category>, AppError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| !published_only || c.is_published)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(&self, form: &CategoryForm) -> Result<Category, AppError> {
        let mut tables = self.tables.write().await;
        if tables.slug_taken(&form.slug, None) {
            return Err(AppError::Conflict(format!("Slug '{}' already exists", form.slug)));
        }

        let category = Category {
            id: tables.next_id(),
            title: form.title.clone(),
            description: form.description.clone(),
            slug: form.slug.clone(),
            is_published: form.is_published,
            created_at: Utc::now(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: &UpdateCategoryRequest) -> Result<Option<Category>, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(slug) = &changes.slug {
            if tables.slug_taken(slug, Some(id)) {
                return Err(AppError::Conflict(format!("Slug '{}' already exists", slug)));
            }
        }

        let Some(category) = tables.categories.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            category.title = title.clone();
        }
        if let Some(description) = &changes.description {
            category.description = description.clone();
        }
        if let Some(slug) = &changes.slug {
            category.slug = slug.clone();
        }
        if let Some(is_published) = changes.is_published {
            category.is_published = is_published;
        }
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(true)
    }

    async fn list_locations(&self, published_only: bool) -> Result<Vec<Location>, AppError> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables
            .locations
            .values()
            .filter(|l| !published_only || l.is_published)
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(locations)
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>, AppError> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn create_location(&self, form: &LocationForm) -> Result<Location, AppError> {
        let mut tables = self.tables.write().await;
        let location = Location {
            id: tables.next_id(),
            name: form.name.clone(),
            is_published: form.is_published,
            created_at: Utc::now(),
        };
        tables.locations.insert(location.id, location.clone());
        Ok(location)
    }

    async fn update_location(&self, id: i64, changes: &UpdateLocationRequest) -> Result<Option<Location>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(location) = tables.locations.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            location.name = name.clone();
        }
        if let Some(is_published) = changes.is_published {
            location.is_published = is_published;
        }
        Ok(Some(location.clone()))
    }

    async fn delete_location(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.locations.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(true)
    }

    async fn count_posts(&self, query: &PostQuery) -> Result<i64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.select(query).len() as i64)
    }

    async fn fetch_posts(&self, query: &PostQuery, window: PageWindow) -> Result<Vec<PostRow>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .select(query)
            .into_iter()
            .skip(window.offset.max(0) as usize)
            .take(window.limit.max(0) as usize)
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRow>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).and_then(|post| tables.join(post)))
    }

    async fn create_post(&self, author_id: i64, form: &PostForm) -> Result<i64, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&author_id) {
            return Err(AppError::InternalServerError(format!("Unknown author {}", author_id)));
        }

        let id = tables.next_id();
        tables.posts.insert(
            id,
            PostRecord {
                id,
                title: form.title.clone(),
                text: form.text.clone(),
                image: form.image.clone(),
                pub_date: form.pub_date.unwrap_or_else(Utc::now),
                author_id,
                location_id: form.location_id,
                category_id: form.category_id,
                is_published: form.is_published,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_post(&self, id: i64, form: &PostForm) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(post) = tables.posts.get_mut(&id) {
            post.title = form.title.clone();
            post.text = form.text.clone();
            post.image = form.image.clone();
            post.pub_date = form.pub_date.unwrap_or(post.pub_date);
            post.location_id = form.location_id;
            post.category_id = form.category_id;
            post.is_published = form.is_published;
        }
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        tables.posts.remove(&id);
        tables.comments.retain(|_, comment| comment.post_id != id);
        Ok(())
    }

    async fn set_post_published(&self, id: i64, published: bool) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(match tables.posts.get_mut(&id) {
            Some(post) => {
                post.is_published = published;
                true
            }
            None => false,
        })
    }

    async fn comment_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentResponse>, AppError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<CommentResponse> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                let author = tables.users.get(&c.author_id)?;
                Some(CommentResponse {
                    id: c.id,
                    post_id: c.post_id,
                    author_id: c.author_id,
                    author_username: author.username.clone(),
                    text: c.text.clone(),
                    is_published: c.is_published,
                    created_at: c.created_at,
                })
            })
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn find_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .get(&comment_id)
            .filter(|c| c.post_id == post_id)
            .cloned())
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&post_id) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let comment = Comment {
            id: tables.next_id(),
            post_id,
            author_id,
            text: text.to_string(),
            is_published: true,
            created_at: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, text: &str) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if let Some(comment) = tables.comments.get_mut(&id) {
            comment.text = text.to_string();
        }
        Ok(())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), AppError> {
        self.tables.write().await.comments.remove(&id);
        Ok(())
    }

    async fn set_comment_published(&self, id: i64, published: bool) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(match tables.comments.get_mut(&id) {
            Some(comment) => {
                comment.is_published = published;
                true
            }
            None => false,
        })
    }
}
