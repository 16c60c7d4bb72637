//! Paginated list fetches.
//!
//! A fetch always replaces the whole cached page of a view with what the
//! service returned. Page-size changes never re-slice the cached items: they
//! go back to page 1 and fetch again.

use super::{CmdMessage, CmdResult, Ctx};
use crate::error::{JotterError, Result};
use crate::model::{Item, Partition};
use crate::pagination::PaginationPatch;
use crate::remote::{ListQuery, ListSource, RemoteService};
use crate::store::View;

fn source(view: View) -> Result<ListSource> {
    match view {
        View::Partition(p) => Ok(ListSource::Partition(p)),
        View::Pinned => Ok(ListSource::Pinned),
        View::Home => Err(JotterError::validation(
            "The home view is fetched as a dashboard",
        )),
        View::Search => Err(JotterError::validation(
            "Search results are fetched with a keyword",
        )),
    }
}

/// Fetches `page` of `view` and replaces the cached page.
pub async fn run<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    view: View,
    page: u32,
    limit: u32,
) -> Result<CmdResult> {
    let source = source(view)?;
    let query = ListQuery::page(page, limit).for_user(ctx.user_id.clone());
    let fetched = ctx
        .remote
        .list_items::<T>(&ctx.auth, source, &query)
        .await?;

    let requested = PaginationPatch {
        page: Some(query.page),
        limit: Some(query.limit),
        ..Default::default()
    };
    let count = fetched.items.len();
    let (listed, pagination) = ctx.store.write(|s| {
        let collection = s.collection_mut::<T>();
        match view {
            View::Partition(p) => collection.replace_partition(p, fetched.items),
            _ => collection.replace_pinned(fetched.items),
        }
        collection.set_pagination(view, &requested);
        if let Some(patch) = &fetched.pagination {
            collection.set_pagination(view, patch);
        }
        (collection.visible(view), collection.pagination(view))
    });
    tracing::debug!(kind = %T::KIND, %view, page = pagination.page, count, "fetched");

    let summary = if pagination.total_items == 0 && listed.is_empty() {
        format!("No {} {}", label_for(view), T::KIND.plural())
    } else {
        format!(
            "Page {} of {} ({} {} {})",
            pagination.page,
            pagination.total_pages.max(1),
            pagination.total_items.max(count as u64),
            label_for(view),
            T::KIND.plural()
        )
    };

    Ok(CmdResult::message(CmdMessage::info(summary))
        .with_listed(listed.into_iter().map(Item::into_any).collect())
        .with_pagination(pagination))
}

fn label_for(view: View) -> &'static str {
    match view {
        View::Partition(Partition::Active) => "active",
        View::Partition(Partition::Archived) => "archived",
        View::Partition(Partition::Trashed) => "trashed",
        View::Pinned => "pinned",
        View::Home => "home",
        View::Search => "matching",
    }
}

/// Moves `view` to `page`, keeping its page size.
pub async fn change_page<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    view: View,
    page: u32,
) -> Result<CmdResult> {
    let current = ctx.store.pagination::<T>(view);
    if ctx.store.read(|s| s.collection::<T>().is_loaded(view)) && !current.can_move_to(page) {
        return Err(JotterError::validation(format!(
            "Page {page} is out of range (1-{})",
            current.total_pages.max(1)
        )));
    }
    run::<T, R>(ctx, view, page, current.limit).await
}

/// Switches `view` to `limit` items per page. Always restarts at page 1.
pub async fn change_limit<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    view: View,
    limit: u32,
) -> Result<CmdResult> {
    if limit == 0 {
        return Err(JotterError::validation("Page size must be at least 1"));
    }
    let reset = ctx.store.pagination::<T>(view).with_limit(limit);
    ctx.store.write(|s| s.set_pagination::<T>(view, &reset.into()));
    run::<T, R>(ctx, view, 1, limit).await
}

/// Refetches the current page of `view`. A page emptied by deletions falls
/// back to the previous page.
pub async fn refresh<T: Item, R: RemoteService>(ctx: &Ctx<'_, R>, view: View) -> Result<CmdResult> {
    let current = ctx.store.pagination::<T>(view);
    let result = run::<T, R>(ctx, view, current.page, current.limit).await?;
    if result.listed.is_empty() && current.page > 1 {
        return run::<T, R>(ctx, view, current.page - 1, current.limit).await;
    }
    Ok(result)
}

/// Best-effort refetch of views an item just moved into. Failures are logged
/// and swallowed; the triggering action has already succeeded.
pub async fn refetch_views<T: Item, R: RemoteService>(ctx: &Ctx<'_, R>, views: Vec<View>) {
    for view in views {
        let current = ctx.store.pagination::<T>(view);
        if let Err(err) = run::<T, R>(ctx, view, current.page, current.limit).await {
            tracing::warn!(kind = %T::KIND, %view, error = %err, "refetch after transition failed");
        }
    }
}
