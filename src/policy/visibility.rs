//! Who may see which post.
//!
//! The same rule backs the home listing, the category listing, the profile
//! listing and the detail lookup. Stores translate [`Visibility`] into their
//! own filters; the in-memory store calls [`is_visible`] directly.

use chrono::{DateTime, Utc};

use crate::models::post::PostRow;

/// Authors always see their own posts, drafts and scheduled ones included.
/// Everybody else only sees live posts.
pub fn is_visible(post: &PostRow, viewer: Option<i64>, now: DateTime<Utc>) -> bool {
    viewer == Some(post.author_id) || is_live(post, now)
}

/// Published, in a published category (or none), and already due.
pub fn is_live(post: &PostRow, now: DateTime<Utc>) -> bool {
    post.is_published && post.category_is_published.unwrap_or(true) && post.pub_date <= now
}

/// The visibility filter step of a post query: "as seen by `viewer_id` at `now`".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub viewer_id: Option<i64>,
    pub now: DateTime<Utc>,
}

impl Visibility {
    pub fn new(viewer_id: Option<i64>, now: DateTime<Utc>) -> Self {
        Self { viewer_id, now }
    }

    pub fn admits(&self, post: &PostRow) -> bool {
        is_visible(post, self.viewer_id, self.now)
    }
}
