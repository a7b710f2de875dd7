// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Default number of posts on one listing page.
pub const POSTS_PER_PAGE: i64 = 10;

/// Where anonymous visitors are sent when a page needs a login.
pub const LOGIN_URL: &str = "/auth/login";

/// Which mail backend delivers post notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBackend {
    /// Writes the message to the log.
    Console,
    /// Writes every message into its own file under `mail_dir`.
    File,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub posts_per_page: i64,
    pub service_email: String,
    pub notify_recipients: Vec<String>,
    pub mail_backend: MailBackend,
    pub mail_dir: String,
    pub media_root: String,
    pub allowed_origins: Vec<String>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let posts_per_page = env::var("POSTS_PER_PAGE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(POSTS_PER_PAGE);

        let mail_backend = match env::var("MAIL_BACKEND").as_deref() {
            Ok("file") => MailBackend::File,
            _ => MailBackend::Console,
        };

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            posts_per_page,
            service_email: env::var("SERVICE_EMAIL")
                .unwrap_or_else(|_| "noreply@blogicum.local".to_string()),
            notify_recipients: split_list(
                &env::var("NOTIFY_RECIPIENTS").unwrap_or_else(|_| "badger@badger.com".to_string()),
            ),
            mail_backend,
            mail_dir: env::var("MAIL_DIR").unwrap_or_else(|_| "sent_emails".to_string()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            allowed_origins: split_list(
                &env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string()),
            ),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }

    /// Whether the in-memory store should be used instead of PostgreSQL.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
