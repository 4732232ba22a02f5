//! Page-number pagination over newest-first listings.
//!
//! Resolution follows the lenient rules of a classic web paginator: a missing
//! or non-numeric page is the first page, while any number outside
//! `1..=num_pages` falls back to the last page.

use std::num::NonZeroU32;

use serde::Serialize;

use crate::application::repos::PageWindow;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Parses the raw `page` query parameter. `None` means "first page".
pub fn parse_page_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: NonZeroU32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            per_page: NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN),
        }
    }
}

impl Paginator {
    pub fn new(per_page: NonZeroU32) -> Self {
        Self { per_page }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.get()
    }

    /// Number of pages for `count` items; an empty listing still has one page.
    pub fn num_pages(&self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.per_page.get())).max(1)
    }

    /// Resolves the requested page number and the matching storage window.
    pub fn resolve(&self, requested: Option<i64>, count: u64) -> (u64, PageWindow) {
        let num_pages = self.num_pages(count);
        let number = match requested {
            None => 1,
            Some(value) if value >= 1 && (value as u64) <= num_pages => value as u64,
            Some(_) => num_pages,
        };
        let per_page = self.per_page.get();
        let window = PageWindow {
            offset: (number - 1) * u64::from(per_page),
            limit: per_page,
        };
        (number, window)
    }

    pub fn page<T>(&self, items: Vec<T>, number: u64, count: u64) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(count),
            total_count: count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_previous() || self.has_next()
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then(|| self.number + 1)
    }

    pub fn page_range(&self) -> std::ops::RangeInclusive<u64> {
        1..=self.num_pages
    }
}
