// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use blogicum::{
    config::{Config, MailBackend},
    models::{category::CategoryForm, post::PostForm},
    notify::{ConsoleMailer, Notifier},
    routes,
    state::AppState,
    store::{BlogStore, MemoryStore},
    utils::{hash::hash_password, jwt::sign_jwt},
};
use chrono::{DateTime, Utc};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub config: Config,
    /// Never follows redirects, so tests can assert on `Location`.
    pub client: reqwest::Client,
}

pub fn test_config() -> Config {
    Config {
        database_url: "memory://".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        posts_per_page: 10,
        service_email: "noreply@blogicum.local".to_string(),
        notify_recipients: vec!["badger@badger.com".to_string()],
        mail_backend: MailBackend::Console,
        mail_dir: "sent_emails".to_string(),
        // Uploads from one test never show up in another.
        media_root: std::env::temp_dir()
            .join(format!("blogicum-media-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_notifier(Arc::new(ConsoleMailer)).await
}

pub async fn spawn_app_with_notifier(notifier: Arc<dyn Notifier>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let config = test_config();

    let state = AppState {
        store: store.clone(),
        config: config.clone(),
        notifier,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        config,
        client,
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Creates a user straight in the store and signs a session token for it.
    pub async fn create_user(&self, prefix: &str) -> TestUser {
        let username = format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8]);
        let hash = hash_password(PASSWORD).unwrap();
        let user = self.store.create_user(&username, &hash, "user").await.unwrap();
        let token = sign_jwt(user.id, &user.username, &user.role, JWT_SECRET, 600).unwrap();
        TestUser {
            id: user.id,
            username,
            token,
        }
    }

    pub async fn create_admin(&self) -> TestUser {
        let username = format!("admin_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let hash = hash_password(PASSWORD).unwrap();
        let user = self.store.create_user(&username, &hash, "admin").await.unwrap();
        let token = sign_jwt(user.id, &user.username, &user.role, JWT_SECRET, 600).unwrap();
        TestUser {
            id: user.id,
            username,
            token,
        }
    }

    pub async fn create_category(&self, slug: &str, is_published: bool) -> i64 {
        let form = CategoryForm {
            title: format!("Category {}", slug),
            description: "About things".to_string(),
            slug: slug.to_string(),
            is_published,
        };
        self.store.create_category(&form).await.unwrap().id
    }

    pub async fn seed_post(&self, author_id: i64, form: &PostForm) -> i64 {
        self.store.create_post(author_id, form).await.unwrap()
    }
}

pub fn post_form(title: &str, pub_date: DateTime<Utc>) -> PostForm {
    PostForm {
        title: title.to_string(),
        text: "Some text".to_string(),
        image: None,
        pub_date: Some(pub_date),
        location_id: None,
        category_id: None,
        is_published: true,
    }
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}
