//! Per-view pagination metadata.
//!
//! The service reports pagination inconsistently: sometimes the full
//! descriptor, sometimes a subset, with `page` or `currentPage`, `totalItems`
//! or `total`. [`PaginationPatch`] captures whatever arrived and
//! [`Pagination::merge`] folds it over the previous value.
//!
//! Navigation flags are never trusted to default to `false`. When the patch
//! omits `hasNext`/`hasPrev` they are recomputed from `page` and `totalPages`,
//! so a partial payload cannot strand the UI on a page with no way forward.

use crate::de;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const SEARCH_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn with_page_size(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total_items: 0,
            total_pages: 1,
            has_next: false,
            has_prev: false,
        }
    }

    /// Shallow merge: fields present in `patch` win, the rest are kept.
    pub fn merge(&mut self, patch: &PaginationPatch) {
        if let Some(page) = patch.page {
            self.page = page.max(1);
        }
        if let Some(limit) = patch.limit {
            self.limit = limit.max(1);
        }
        if let Some(total) = patch.total_items {
            self.total_items = total;
        }
        if let Some(pages) = patch.total_pages {
            self.total_pages = pages;
        }
        self.has_next = patch.has_next.unwrap_or(self.page < self.total_pages);
        self.has_prev = patch.has_prev.unwrap_or(self.page > 1);
    }

    /// A new page size invalidates the current page; always restart at 1.
    pub fn with_limit(self, limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            has_prev: false,
            has_next: self.total_pages > 1,
            ..self
        }
    }

    pub fn can_move_to(&self, page: u32) -> bool {
        page >= 1 && (page <= self.total_pages.max(1) || page == self.page)
    }
}

/// Pagination fields as they arrive from the service; anything may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationPatch {
    #[serde(
        default,
        alias = "currentPage",
        alias = "current_page",
        deserialize_with = "de::opt_u32"
    )]
    pub page: Option<u32>,
    #[serde(default, alias = "perPage", alias = "per_page", deserialize_with = "de::opt_u32")]
    pub limit: Option<u32>,
    #[serde(
        default,
        alias = "total",
        alias = "totalCount",
        alias = "total_items",
        deserialize_with = "de::opt_u64"
    )]
    pub total_items: Option<u64>,
    #[serde(default, alias = "total_pages", deserialize_with = "de::opt_u32")]
    pub total_pages: Option<u32>,
    #[serde(
        default,
        alias = "has_next",
        alias = "hasNextPage",
        deserialize_with = "de::opt_flag"
    )]
    pub has_next: Option<bool>,
    #[serde(
        default,
        alias = "has_prev",
        alias = "hasPrevPage",
        deserialize_with = "de::opt_flag"
    )]
    pub has_prev: Option<bool>,
}

impl PaginationPatch {
    pub fn pages(page: u32, total_pages: u32) -> Self {
        Self {
            page: Some(page),
            total_pages: Some(total_pages),
            ..Self::default()
        }
    }
}

impl From<Pagination> for PaginationPatch {
    fn from(p: Pagination) -> Self {
        Self {
            page: Some(p.page),
            limit: Some(p.limit),
            total_items: Some(p.total_items),
            total_pages: Some(p.total_pages),
            has_next: Some(p.has_next),
            has_prev: Some(p.has_prev),
        }
    }
}
