// src/policy/mod.rs

pub mod ownership;
pub mod pagination;
pub mod visibility;

pub use ownership::{Access, Action, Owned, authorize};
pub use pagination::{Page, PageWindow, Paginator};
pub use visibility::{Visibility, is_live, is_visible};
