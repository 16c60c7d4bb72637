//! Lifecycle moves: archive, unarchive, trash, restore, pin and permanent delete.
//!
//! Each move is one request. The store is written only after the service
//! confirms, with the item the service returned. When the item is cached the
//! local state machine refuses illegal moves up front; uncached items are left
//! for the service to judge.

use super::fetch::refetch_views;
use super::{CmdMessage, CmdResult, Ctx};
use crate::error::{JotterError, Result};
use crate::lifecycle::Action;
use crate::model::{Item, ItemId};
use crate::remote::RemoteService;

pub async fn run<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    id: &ItemId,
    action: Action,
) -> Result<CmdResult> {
    if let Some(from) = ctx.store.read(|s| s.collection::<T>().cached_lifecycle(id)) {
        if from.apply(action).is_none() {
            return Err(JotterError::InvalidTransition { action, from });
        }
    }

    if action == Action::Delete {
        return delete::<T, R>(ctx, id).await;
    }

    let item = ctx.remote.transition::<T>(&ctx.auth, id, action).await?;
    tracing::debug!(kind = %T::KIND, %id, %action, "transition confirmed");

    let refetch = ctx.store.write(|s| s.apply_transition(item.clone()));
    refetch_views::<T, R>(ctx, refetch).await;

    Ok(CmdResult::message(message::<T>(action, &item)).with_affected(vec![item.into_any()]))
}

async fn delete<T: Item, R: RemoteService>(ctx: &Ctx<'_, R>, id: &ItemId) -> Result<CmdResult> {
    ctx.remote.delete_item::<T>(&ctx.auth, id).await?;
    ctx.store.write(|s| s.remove_everywhere::<T>(id));
    Ok(CmdResult::message(CmdMessage::info(format!(
        "{} deleted permanently",
        T::KIND.label()
    ))))
}

fn message<T: Item>(action: Action, item: &T) -> CmdMessage {
    let label = T::KIND.label();
    match action {
        Action::Archive => CmdMessage::info(format!("{label} archived")),
        Action::Unarchive => CmdMessage::success(format!("{label} unarchived")),
        Action::Trash => CmdMessage::info(format!("{label} moved to trash")),
        Action::Restore => CmdMessage::success(format!("{label} restored from trash")),
        Action::TogglePin if item.meta().is_pinned => {
            CmdMessage::success(format!("{label} pinned"))
        }
        Action::TogglePin => CmdMessage::success(format!("{label} unpinned")),
        Action::Delete => CmdMessage::info(format!("{label} deleted permanently")),
    }
}
