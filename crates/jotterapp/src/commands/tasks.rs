//! Tasks of a todo.
//!
//! Tasks have their own endpoints but are only cached inside their parent
//! todo. After the service confirms, the returned task is applied to every
//! cached copy of that todo. A parent that is not cached at all means the
//! caller holds a stale reference; the service call still stands, so this is
//! logged rather than reported as a failure.

use super::{CmdMessage, CmdResult, Ctx};
use crate::error::{JotterError, Result};
use crate::model::{AnyItem, Item, ItemId, Task, TaskDraft, TaskPatch, Todo};
use crate::remote::RemoteService;

fn affected_todo<R: RemoteService>(ctx: &Ctx<'_, R>, todo_id: &ItemId) -> Vec<AnyItem> {
    ctx.store
        .find::<Todo>(todo_id)
        .map(|todo| vec![todo.into_any()])
        .unwrap_or_default()
}

fn stale(todo_id: &ItemId, task_id: &ItemId, op: &str) {
    tracing::warn!(%todo_id, %task_id, op, "todo not cached, task change not mirrored");
}

pub async fn add_task<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    todo_id: &ItemId,
    title: &str,
) -> Result<CmdResult> {
    let title = title.trim();
    if title.is_empty() {
        return Err(JotterError::validation("Task title is required"));
    }
    let draft = TaskDraft {
        todo_id: todo_id.clone(),
        title: title.to_string(),
        is_completed: false,
    };
    let task = ctx.remote.create_task(&ctx.auth, &draft).await?;
    if !ctx.store.write(|s| s.todos_mut().add_task(todo_id, task.clone())) {
        stale(todo_id, &task.id, "add");
    }
    Ok(CmdResult::message(CmdMessage::success("Task created successfully"))
        .with_affected(affected_todo(ctx, todo_id)))
}

pub async fn update_task<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    todo_id: &ItemId,
    task_id: &ItemId,
    patch: TaskPatch,
) -> Result<CmdResult> {
    let patch = TaskPatch {
        todo_id: Some(todo_id.clone()),
        ..patch
    };
    let task: Task = ctx.remote.update_task(&ctx.auth, task_id, &patch).await?;
    if !ctx.store.write(|s| s.todos_mut().update_task(todo_id, task.clone())) {
        stale(todo_id, task_id, "update");
    }
    Ok(CmdResult::message(CmdMessage::success("Task updated successfully"))
        .with_affected(affected_todo(ctx, todo_id)))
}

pub async fn set_task_completed<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    todo_id: &ItemId,
    task_id: &ItemId,
    done: bool,
) -> Result<CmdResult> {
    let patch = TaskPatch {
        is_completed: Some(done),
        ..Default::default()
    };
    update_task(ctx, todo_id, task_id, patch).await
}

pub async fn rename_task<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    todo_id: &ItemId,
    task_id: &ItemId,
    title: &str,
) -> Result<CmdResult> {
    let title = title.trim();
    if title.is_empty() {
        return Err(JotterError::validation("Task title is required"));
    }
    let patch = TaskPatch {
        title: Some(title.to_string()),
        ..Default::default()
    };
    update_task(ctx, todo_id, task_id, patch).await
}

pub async fn remove_task<R: RemoteService>(
    ctx: &Ctx<'_, R>,
    todo_id: &ItemId,
    task_id: &ItemId,
) -> Result<CmdResult> {
    ctx.remote.delete_task(&ctx.auth, task_id).await?;
    if !ctx.store.write(|s| s.todos_mut().remove_task(todo_id, task_id)) {
        stale(todo_id, task_id, "remove");
    }
    Ok(CmdResult::message(CmdMessage::info("Task deleted successfully"))
        .with_affected(affected_todo(ctx, todo_id)))
}
