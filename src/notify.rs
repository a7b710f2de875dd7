//! Best-effort notices (a mail stub).
//!
//! A notice never decides the outcome of the request that triggered it:
//! it is sent from a detached task and failures end up in the log only.

use std::{
    fmt,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::{Config, MailBackend};

/// An email-like message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub message: String,
    pub from: String,
    pub to: Vec<String>,
}

impl Notice {
    /// Sent after a post has been created.
    pub fn new_post(config: &Config, title: &str, username: &str) -> Self {
        Self {
            subject: format!("New post added - {}", title),
            message: format!("{} add post!", username),
            from: config.service_email.clone(),
            to: config.notify_recipients.clone(),
        }
    }

    fn render(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\nDate: {}\n\n{}\n",
            self.from,
            self.to.join(", "),
            self.subject,
            Utc::now().to_rfc2822(),
            self.message
        )
    }
}

#[derive(Debug)]
pub enum NotifyError {
    Io(std::io::Error),
    Rejected(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Io(e) => write!(f, "mail I/O error: {}", e),
            NotifyError::Rejected(reason) => write!(f, "mail rejected: {}", reason),
        }
    }
}

impl std::error::Error for NotifyError {}

impl From<std::io::Error> for NotifyError {
    fn from(err: std::io::Error) -> Self {
        NotifyError::Io(err)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Writes notices to the log.
pub struct ConsoleMailer;

#[async_trait]
impl Notifier for ConsoleMailer {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        if notice.to.is_empty() {
            return Err(NotifyError::Rejected("no recipients".to_string()));
        }
        tracing::info!(
            from = %notice.from,
            to = %notice.to.join(", "),
            subject = %notice.subject,
            "{}",
            notice.message
        );
        Ok(())
    }
}

/// Writes each notice into its own file.
pub struct FileMailer {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl FileMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Notifier for FileMailer {
    async fn send(&self, notice: &Notice) -> Result<(), NotifyError> {
        if notice.to.is_empty() {
            return Err(NotifyError::Rejected("no recipients".to_string()));
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}.log", Utc::now().format("%Y%m%d-%H%M%S%.f"), seq);
        tokio::fs::write(self.dir.join(name), notice.render()).await?;
        Ok(())
    }
}

pub fn from_config(config: &Config) -> Arc<dyn Notifier> {
    match config.mail_backend {
        MailBackend::Console => Arc::new(ConsoleMailer),
        MailBackend::File => Arc::new(FileMailer::new(&config.mail_dir)),
    }
}

/// Sends `notice` on a detached task. Errors are logged, never returned.
pub fn notify_in_background(notifier: Arc<dyn Notifier>, notice: Notice) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notice).await {
            tracing::warn!(subject = %notice.subject, "Notification failed: {}", e);
        }
    })
}
