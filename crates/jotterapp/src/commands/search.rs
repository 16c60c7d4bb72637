//! Keyword search across notes and todos.
//!
//! Results land in the search view of both collections and share one
//! pagination descriptor. A new keyword always starts at page 1.

use super::{CmdMessage, CmdResult, Ctx};
use crate::error::{JotterError, Result};
use crate::model::Item;
use crate::pagination::PaginationPatch;
use crate::remote::{RemoteService, SearchQuery};
use crate::store::View;

pub async fn run<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    query: SearchQuery,
    page: u32,
) -> Result<CmdResult> {
    if query.keyword.trim().is_empty() {
        return Ok(clear(ctx));
    }
    let limit = ctx.store.read(|s| s.settings().search_page_size).max(1);
    let found = ctx.remote.search(&ctx.auth, &query, page, limit).await?;

    let server = found.pagination.unwrap_or_default();
    let patch = PaginationPatch {
        page: server.page.or(Some(page)),
        limit: server.limit.or(Some(limit)),
        ..server
    };
    let count = found.notes.len() + found.todos.len();
    let keyword = query.keyword.clone();

    let (listed, pagination) = ctx.store.write(|s| {
        s.set_search_results(query, found.notes, found.todos, &patch);
        let mut listed: Vec<_> = s
            .notes()
            .visible(View::Search)
            .into_iter()
            .map(Item::into_any)
            .collect();
        listed.extend(s.todos().visible(View::Search).into_iter().map(Item::into_any));
        (listed, s.notes().pagination(View::Search))
    });
    tracing::debug!(%keyword, page, count, "search results");

    let total = pagination.total_items.max(count as u64);
    let message = if total == 0 {
        CmdMessage::info(format!("No results for \"{keyword}\""))
    } else {
        let noun = if total == 1 { "result" } else { "results" };
        CmdMessage::info(format!(
            "Found {total} {noun} for \"{keyword}\" (page {} of {})",
            pagination.page,
            pagination.total_pages.max(1)
        ))
    };
    Ok(CmdResult::message(message)
        .with_listed(listed)
        .with_pagination(pagination))
}

/// Moves the current search to another page.
pub async fn change_page<R: RemoteService>(ctx: &Ctx<'_, R>, page: u32) -> Result<CmdResult> {
    let (query, current) = ctx.store.read(|s| {
        (
            s.search_query().cloned(),
            s.notes().pagination(View::Search),
        )
    });
    let query = query.ok_or_else(|| JotterError::validation("No active search"))?;
    if !current.can_move_to(page) {
        return Err(JotterError::validation(format!(
            "Page {page} is out of range (1-{})",
            current.total_pages.max(1)
        )));
    }
    run(ctx, query, page).await
}

/// Drops the search results. No request is made.
pub fn clear<R: RemoteService>(ctx: &Ctx<'_, R>) -> CmdResult {
    ctx.store.write(|s| s.clear_search());
    CmdResult::message(CmdMessage::info("Search cleared"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::lifecycle;
    use crate::lifecycle::Action;
    use crate::model::{ItemKind, Note, NoteDraft, Partition, Todo, TodoDraft};
    use crate::test_utils::TestEnv;

    #[tokio::test]
    async fn search_fills_both_kinds_with_shared_pagination() {
        let env = TestEnv::new().await;
        env.remote.seed::<Note>(&env.user_id, &NoteDraft::new("Milk prices", ""));
        env.remote.seed::<Todo>(&env.user_id, &TodoDraft::new("Buy milk"));
        env.remote.seed::<Note>(&env.user_id, &NoteDraft::new("Unrelated", ""));

        let result = run(&env.ctx(), SearchQuery::new("milk"), 1).await.unwrap();

        assert_eq!(result.listed.len(), 2);
        assert_eq!(result.messages[0].content, "Found 2 results for \"milk\" (page 1 of 1)");
        let req = env.remote.requests().pop().unwrap();
        assert_eq!(req.param("limit"), Some("20"));
        assert_eq!(req.param("type"), Some("all"));
        assert_eq!(env.store.visible::<Todo>(View::Search).len(), 1);
    }

    #[tokio::test]
    async fn kind_filter_is_sent_as_type() {
        let env = TestEnv::new().await;
        env.remote.seed::<Note>(&env.user_id, &NoteDraft::new("milk", ""));
        let mut query = SearchQuery::new("milk");
        query.kind = Some(ItemKind::Todo);

        let result = run(&env.ctx(), query, 1).await.unwrap();

        assert!(result.listed.is_empty());
        assert_eq!(result.messages[0].content, "No results for \"milk\"");
        assert_eq!(env.remote.requests().pop().unwrap().param("type"), Some("todo"));
    }

    #[tokio::test]
    async fn trashing_a_hit_drops_it_from_unscoped_results() {
        let env = TestEnv::new().await;
        let id = env.remote.seed::<Note>(&env.user_id, &NoteDraft::new("milk", ""));
        let ctx = env.ctx();
        run(&ctx, SearchQuery::new("milk"), 1).await.unwrap();

        lifecycle::run::<Note, _>(&ctx, &id, Action::Trash).await.unwrap();

        assert!(env.store.visible::<Note>(View::Search).is_empty());
    }

    #[tokio::test]
    async fn trash_scoped_search_keeps_trashed_hits() {
        let env = TestEnv::new().await;
        let id = env.remote.seed::<Note>(&env.user_id, &NoteDraft::new("milk", ""));
        env.remote.set_flags(ItemKind::Note, &id, false, true, false);
        let mut query = SearchQuery::new("milk");
        query.category = Some(Partition::Trashed);

        let result = run(&env.ctx(), query, 1).await.unwrap();

        assert_eq!(result.listed.len(), 1);
    }

    #[tokio::test]
    async fn blank_keyword_clears_without_a_request() {
        let env = TestEnv::new().await;
        env.remote.seed::<Note>(&env.user_id, &NoteDraft::new("milk", ""));
        let ctx = env.ctx();
        run(&ctx, SearchQuery::new("milk"), 1).await.unwrap();
        env.remote.clear_requests();

        let result = run(&ctx, SearchQuery::new("  "), 1).await.unwrap();

        assert_eq!(result.messages[0].content, "Search cleared");
        assert!(env.remote.requests().is_empty());
        assert!(env.store.read(|s| s.search_query().is_none()));
    }

    #[tokio::test]
    async fn change_page_needs_an_active_search() {
        let env = TestEnv::new().await;
        assert!(change_page(&env.ctx(), 2).await.is_err());
    }

    #[tokio::test]
    async fn change_page_keeps_the_query() {
        let env = TestEnv::new().await;
        for i in 0..25 {
            env.remote.seed::<Note>(&env.user_id, &NoteDraft::new(format!("milk {i}"), ""));
        }
        let ctx = env.ctx();
        run(&ctx, SearchQuery::new("milk"), 1).await.unwrap();

        let result = change_page(&ctx, 2).await.unwrap();

        assert_eq!(result.listed.len(), 5);
        let req = env.remote.requests().pop().unwrap();
        assert_eq!(req.param("keyword"), Some("milk"));
        assert_eq!(req.param("page"), Some("2"));
    }
}
