//! Ownership guard for mutation endpoints.
//!
//! Handlers call [`authorize`] first thing and turn the [`Access`] into a
//! response. An authenticated non-owner is sent back to the read-only view of
//! the entity instead of getting a 403: that is the intended UX.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, login_url},
    models::{comment::Comment, post::PostRow},
    policy::visibility::is_visible,
    utils::{jwt::CurrentUser, urls},
};

/// What the actor is trying to do with the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
    /// Add a comment to a post; the post must be visible to the actor.
    Comment { now: DateTime<Utc> },
}

/// Outcome of the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Permit,
    RedirectTo(String),
    /// Rendered as not-found so hidden entities stay indistinguishable from missing ones.
    Deny,
}

impl Access {
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Access::Permit => Ok(()),
            Access::RedirectTo(url) => Err(AppError::RedirectAway(url)),
            Access::Deny => Err(AppError::NotFound("Not found".to_string())),
        }
    }
}

/// Something with an author and a public page.
pub trait Owned {
    fn author_id(&self) -> i64;

    /// Where a non-owner is sent instead.
    fn detail_url(&self) -> String;

    fn visible_to(&self, _viewer: Option<i64>, _now: DateTime<Utc>) -> bool {
        true
    }
}

impl Owned for PostRow {
    fn author_id(&self) -> i64 {
        self.author_id
    }

    fn detail_url(&self) -> String {
        urls::post_detail(self.id)
    }

    fn visible_to(&self, viewer: Option<i64>, now: DateTime<Utc>) -> bool {
        is_visible(self, viewer, now)
    }
}

impl Owned for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }

    // Comments have no page of their own.
    fn detail_url(&self) -> String {
        urls::post_detail(self.post_id)
    }
}

pub fn authorize<E: Owned + ?Sized>(
    actor: Option<&CurrentUser>,
    entity: &E,
    action: Action,
) -> Access {
    let Some(actor) = actor else {
        return Access::RedirectTo(login_url(&entity.detail_url()));
    };

    match action {
        Action::Edit | Action::Delete => {
            if entity.author_id() != actor.id {
                return Access::RedirectTo(entity.detail_url());
            }
            Access::Permit
        }
        Action::Comment { now } => {
            if !entity.visible_to(Some(actor.id), now) {
                return Access::Deny;
            }
            Access::Permit
        }
    }
}
