//! Page-number pagination with clamping.

use serde::Serialize;

/// Splits `total` rows into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: i64,
    per_page: i64,
}

/// The slice of rows a page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub offset: i64,
    pub limit: i64,
}

impl Paginator {
    pub fn new(total: i64, per_page: i64) -> Self {
        Self {
            total: total.max(0),
            per_page: per_page.max(1),
        }
    }

    /// An empty listing still has one (empty) page.
    pub fn num_pages(&self) -> i64 {
        if self.total == 0 {
            1
        } else {
            (self.total - 1) / self.per_page + 1
        }
    }

    /// Resolves a raw `?page=` value. Garbage means page 1, `last` means the
    /// last page, and out-of-range numbers clamp to the nearest valid page.
    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        let last = self.num_pages();
        let number = match requested.map(str::trim) {
            Some("last") => last,
            Some(raw) => raw.parse::<i64>().unwrap_or(1).clamp(1, last),
            None => 1,
        };

        PageWindow {
            number,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

/// Template context for one page of a listing.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub number: i64,
    pub num_pages: i64,
    /// Total rows across all pages.
    pub count: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<i64>,
    pub next_page_number: Option<i64>,
    pub object_list: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(paginator: &Paginator, window: PageWindow, object_list: Vec<T>) -> Self {
        let num_pages = paginator.num_pages();
        let has_previous = window.number > 1;
        let has_next = window.number < num_pages;
        Self {
            number: window.number,
            num_pages,
            count: paginator.total,
            has_previous,
            has_next,
            previous_page_number: has_previous.then(|| window.number - 1),
            next_page_number: has_next.then(|| window.number + 1),
            object_list,
        }
    }
}
