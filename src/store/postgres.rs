//! PostgreSQL store.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

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

/// Post columns joined with author, category and location.
const POST_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.text, p.image, p.pub_date, p.is_published, p.created_at,
        p.author_id, u.username AS author_username,
        p.category_id, c.title AS category_title, c.slug AS category_slug,
        c.is_published AS category_is_published,
        p.location_id, CASE WHEN l.is_published THEN l.name END AS location_name
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const POST_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM posts p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const USER_COLUMNS: &str =
    "id, username, password, first_name, last_name, email, role, created_at";

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clause of a post query. Expects `p` (posts) and `c`
/// (categories, left-joined) in scope.
fn push_post_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    builder.push(" WHERE TRUE");

    if let Some(visibility) = query.visibility {
        builder.push(" AND (");
        if let Some(viewer) = visibility.viewer_id {
            builder.push("p.author_id = ");
            builder.push_bind(viewer);
            builder.push(" OR ");
        }
        builder.push(
            "(p.is_published AND (p.category_id IS NULL OR c.is_published) AND p.pub_date <= ",
        );
        builder.push_bind(visibility.now);
        builder.push("))");
    }

    if let Some(category_id) = query.category_id {
        builder.push(" AND p.category_id = ");
        builder.push_bind(category_id);
    }

    if let Some(author_id) = query.author_id {
        builder.push(" AND p.author_id = ");
        builder.push_bind(author_id);
    }
}

#[async_trait]
impl BlogStore for PgStore {
    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: i64, form: &ProfileForm) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, email = $3, username = $4
            WHERE id = $5
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&form.first_name)
        .bind(&form.last_name)
        .bind(form.email.as_deref().unwrap_or_default())
        .bind(&form.username)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
    }

    async fn list_categories(&self, published_only: bool) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE ($1 = FALSE OR is_published) ORDER BY title, id",
            CATEGORY_COLUMNS
        ))
        .bind(published_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE slug = $1",
            CATEGORY_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn create_category(&self, form: &CategoryForm) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (title, description, slug, is_published)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CATEGORY_COLUMNS
        ))
        .bind(&form.title)
        .bind(&form.description)
        .bind(&form.slug)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: &UpdateCategoryRequest) -> Result<Option<Category>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE categories SET ");
        let mut separated = builder.separated(", ");
        // Keeps the statement valid when nothing changes.
        separated.push("id = id");

        if let Some(title) = &changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title.clone());
        }

        if let Some(description) = &changes.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.clone());
        }

        if let Some(slug) = &changes.slug {
            separated.push("slug = ");
            separated.push_bind_unseparated(slug.clone());
        }

        if let Some(is_published) = changes.is_published {
            separated.push("is_published = ");
            separated.push_bind_unseparated(is_published);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(CATEGORY_COLUMNS);

        let category = builder
            .build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        // posts.category_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_locations(&self, published_only: bool) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE ($1 = FALSE OR is_published) ORDER BY name, id",
            LOCATION_COLUMNS
        ))
        .bind(published_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "SELECT {} FROM locations WHERE id = $1",
            LOCATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    async fn create_location(&self, form: &LocationForm) -> Result<Location, AppError> {
        let location = sqlx::query_as::<_, Location>(&format!(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) RETURNING {}",
            LOCATION_COLUMNS
        ))
        .bind(&form.name)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await?;

        Ok(location)
    }

    async fn update_location(&self, id: i64, changes: &UpdateLocationRequest) -> Result<Option<Location>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE locations SET ");
        let mut separated = builder.separated(", ");
        separated.push("id = id");

        if let Some(name) = &changes.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }

        if let Some(is_published) = changes.is_published {
            separated.push("is_published = ");
            separated.push_bind_unseparated(is_published);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING ");
        builder.push(LOCATION_COLUMNS);

        let location = builder
            .build_query_as::<Location>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    async fn delete_location(&self, id: i64) -> Result<bool, AppError> {
        // posts.location_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM locations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_posts(&self, query: &PostQuery) -> Result<i64, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_COUNT);
        push_post_filters(&mut builder, query);

        let total: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn fetch_posts(&self, query: &PostQuery, window: PageWindow) -> Result<Vec<PostRow>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_SELECT);
        push_post_filters(&mut builder, query);
        builder.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        builder.push_bind(window.limit);
        builder.push(" OFFSET ");
        builder.push_bind(window.offset);

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list posts: {:?}", e);
                AppError::from(e)
            })?;

        Ok(rows)
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostRow>, AppError> {
        let post = sqlx::query_as::<_, PostRow>(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    async fn create_post(&self, author_id: i64, form: &PostForm) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO posts (title, text, image, pub_date, author_id, location_id, category_id, is_published)
            VALUES ($1, $2, $3, COALESCE($4, NOW()), $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&form.title)
        .bind(&form.text)
        .bind(&form.image)
        .bind(form.pub_date)
        .bind(author_id)
        .bind(form.location_id)
        .bind(form.category_id)
        .bind(form.is_published)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        })?;

        Ok(id)
    }

    async fn update_post(&self, id: i64, form: &PostForm) -> Result<(), AppError> {
        // author_id never changes after creation.
        sqlx::query(
            r#"
            UPDATE posts
            SET title = $1, text = $2, image = $3, pub_date = COALESCE($4, pub_date),
                location_id = $5, category_id = $6, is_published = $7
            WHERE id = $8
            "#,
        )
        .bind(&form.title)
        .bind(&form.text)
        .bind(&form.image)
        .bind(form.pub_date)
        .bind(form.location_id)
        .bind(form.category_id)
        .bind(form.is_published)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_post(&self, id: i64) -> Result<(), AppError> {
        // comments.post_id is ON DELETE CASCADE
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete post: {:?}", e);
                AppError::from(e)
            })?;

        Ok(())
    }

    async fn set_post_published(&self, id: i64, published: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE posts SET is_published = $1 WHERE id = $2")
            .bind(published)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn comment_counts(&self, post_ids: &[i64]) -> Result<HashMap<i64, i64>, AppError> {
        let rows = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT post_id, COUNT(*)
            FROM comments
            WHERE post_id = ANY($1)
            GROUP BY post_id
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentResponse>, AppError> {
        let comments = sqlx::query_as::<_, CommentResponse>(
            r#"
            SELECT
                c.id, c.post_id, c.author_id, u.username AS author_username,
                c.text, c.is_published, c.created_at
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    async fn find_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, author_id, text, is_published, created_at
            FROM comments
            WHERE id = $1 AND post_id = $2
            "#,
        )
        .bind(comment_id)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<Comment, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, is_published, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    async fn update_comment(&self, id: i64, text: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE comments SET text = $1 WHERE id = $2")
            .bind(text)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_comment_published(&self, id: i64, published: bool) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE comments SET is_published = $1 WHERE id = $2")
            .bind(published)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
