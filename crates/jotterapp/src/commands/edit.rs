//! Opening, creating and updating items.

use super::fetch::refetch_views;
use super::{CmdMessage, CmdResult, Ctx};
use crate::error::Result;
use crate::model::{Item, ItemDraft, ItemId};
use crate::remote::RemoteService;

/// Loads the server copy of an item into the selected slot.
pub async fn open<T: Item, R: RemoteService>(ctx: &Ctx<'_, R>, id: &ItemId) -> Result<CmdResult> {
    let item = ctx.remote.get_item::<T>(&ctx.auth, id).await?;
    ctx.store.write(|s| {
        let collection = s.collection_mut::<T>();
        // Refresh every cached copy; a fresh read never warrants a refetch.
        collection.apply_transition(item.clone());
        collection.set_selected(Some(item.clone()));
    });
    Ok(CmdResult::message(CmdMessage::info(format!(
        "Opened {} \"{}\"",
        T::KIND,
        item.title()
    )))
    .with_affected(vec![item.into_any()]))
}

/// Creates an item and puts it at the head of its partition.
pub async fn create<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    draft: T::Draft,
) -> Result<CmdResult> {
    let item = create_quiet::<T, R>(ctx, draft).await?;
    Ok(
        CmdResult::message(CmdMessage::success(format!("{} created successfully", T::KIND.label())))
            .with_affected(vec![item.into_any()]),
    )
}

/// Creates without building a result. Used by the editor's first save.
pub(crate) async fn create_quiet<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    draft: T::Draft,
) -> Result<T> {
    let draft = draft.titled_or(T::UNTITLED);
    let item = ctx.remote.create_item::<T>(&ctx.auth, &draft).await?;
    tracing::debug!(kind = %T::KIND, id = %item.id(), "created");
    ctx.store
        .write(|s| s.upsert_into_partition(item.partition(), item.clone()));
    Ok(item)
}

/// Saves edited fields and applies the confirmed item everywhere it is cached.
pub async fn update<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    id: &ItemId,
    draft: T::Draft,
) -> Result<CmdResult> {
    let item = update_quiet::<T, R>(ctx, id, draft).await?;
    Ok(
        CmdResult::message(CmdMessage::success(format!("{} updated successfully", T::KIND.label())))
            .with_affected(vec![item.into_any()]),
    )
}

pub(crate) async fn update_quiet<T: Item, R: RemoteService>(
    ctx: &Ctx<'_, R>,
    id: &ItemId,
    draft: T::Draft,
) -> Result<T> {
    let draft = draft.titled_or(T::UNTITLED);
    let item = ctx.remote.update_item::<T>(&ctx.auth, id, &draft).await?;
    let refetch = ctx.store.write(|s| s.apply_transition(item.clone()));
    refetch_views::<T, R>(ctx, refetch).await;
    Ok(item)
}
