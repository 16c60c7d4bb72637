//! The home dashboard: one page of active notes and todos, newest first, with
//! the pinned items of both kinds alongside.
//!
//! Like search, the dashboard fills the home view of both collections and
//! keeps one pagination descriptor for the pair. The kind filter is kept so
//! that paging stays on the same filter.

use super::{CmdMessage, CmdResult, Ctx};
use crate::error::{JotterError, Result};
use crate::model::{Item, ItemKind, Note};
use crate::ordering::sort_mixed;
use crate::pagination::PaginationPatch;
use crate::remote::{DashboardQuery, RemoteService};
use crate::store::{HomePage, View};

fn counted(n: u64, kind: ItemKind) -> String {
    if n == 1 {
        format!("1 {kind}")
    } else {
        format!("{n} {}", kind.plural())
    }
}

pub async fn run<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    kind: Option<ItemKind>,
    page: u32,
) -> Result<CmdResult> {
    let limit = ctx.store.pagination::<Note>(View::Home).limit;
    let query = DashboardQuery::new(kind, page, limit).for_user(ctx.user_id.clone());
    let found = ctx.remote.dashboard(&ctx.auth, &query).await?;

    let server = found.pagination.unwrap_or_default();
    let patch = PaginationPatch {
        page: server.page.or(Some(query.page)),
        limit: server.limit.or(Some(query.limit)),
        ..server
    };
    let total_notes = found.total_notes.unwrap_or(found.notes.len() as u64);
    let total_todos = found.total_todos.unwrap_or(found.todos.len() as u64);
    let home = HomePage {
        notes: found.notes,
        todos: found.todos,
        pinned_notes: found.pinned_notes,
        pinned_todos: found.pinned_todos,
    };

    let (listed, pagination) = ctx.store.write(|s| {
        s.set_home(kind, home, &patch);
        let mut listed: Vec<_> = s
            .notes()
            .items(View::Home)
            .iter()
            .cloned()
            .map(Item::into_any)
            .collect();
        listed.extend(s.todos().items(View::Home).iter().cloned().map(Item::into_any));
        sort_mixed(&mut listed);
        (listed, s.notes().pagination(View::Home))
    });
    tracing::debug!(?kind, page = pagination.page, count = listed.len(), "dashboard");

    let totals: Vec<String> = [(ItemKind::Note, total_notes), (ItemKind::Todo, total_todos)]
        .into_iter()
        .filter(|(k, _)| query.includes(*k))
        .map(|(k, n)| counted(n, k))
        .collect();
    let message = if listed.is_empty() && total_notes + total_todos == 0 {
        match kind {
            Some(kind) => format!("No active {}", kind.plural()),
            None => "No active notes or todos".to_string(),
        }
    } else {
        format!(
            "Page {} of {} ({})",
            pagination.page,
            pagination.total_pages.max(1),
            totals.join(", ")
        )
    };
    Ok(CmdResult::message(CmdMessage::info(message))
        .with_listed(listed)
        .with_pagination(pagination))
}

/// Moves the dashboard to another page, keeping its kind filter.
pub async fn change_page<R: RemoteService>(ctx: &Ctx<'_, R>, page: u32) -> Result<CmdResult> {
    let (filter, current) = ctx.store.read(|s| {
        (
            s.home_filter(),
            s.notes().pagination(View::Home),
        )
    });
    let kind = filter.ok_or_else(|| JotterError::validation("The home page is not loaded"))?;
    if !current.can_move_to(page) {
        return Err(JotterError::validation(format!(
            "Page {page} is out of range (1-{})",
            current.total_pages.max(1)
        )));
    }
    run(ctx, kind, page).await
}
