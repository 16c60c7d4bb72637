//! Display order shared by every list view.
//!
//! Pinned items come first. Within the pinned and unpinned groups, items are
//! ordered by `updatedAt` descending, falling back to `createdAt`; items with
//! neither timestamp sink to the bottom. The sort is stable, so ties keep the
//! order in which the store holds them.
//!
//! Server responses are not assumed to be sorted this way, so consumers call
//! [`sort_for_display`] after every store mutation rather than caching order.

use crate::model::{AnyItem, Item, ItemMeta};
use std::cmp::Ordering;

pub fn display_cmp<T: Item>(a: &T, b: &T) -> Ordering {
    meta_cmp(a.meta(), b.meta())
}

fn meta_cmp(a: &ItemMeta, b: &ItemMeta) -> Ordering {
    b.is_pinned
        .cmp(&a.is_pinned)
        .then_with(|| match (a.recency(), b.recency()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

pub fn sort_for_display<T: Item>(items: &mut [T]) {
    items.sort_by(display_cmp);
}

/// Same order for a list that mixes notes and todos.
pub fn sort_mixed(items: &mut [AnyItem]) {
    items.sort_by(|a, b| meta_cmp(a.meta(), b.meta()));
}
