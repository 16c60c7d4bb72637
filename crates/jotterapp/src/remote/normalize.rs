//! # Response Normalization
//!
//! The service answers the same kind of request in different shapes depending
//! on the endpoint. This module is the single place that knows about them:
//!
//! | Payload      | Shapes accepted                                               |
//! |--------------|---------------------------------------------------------------|
//! | list         | `data: [..]`, `data.items`, `data.{notes,todos}`, top-level `notes`/`todos` |
//! | pinned       | `data.notes` and `data.todos` in one body, split per kind     |
//! | dashboard    | `data.items.{notes,todos}`, `data.pinned.{notes,todos}`       |
//! | user         | `user`, `data.user`, `data`                                   |
//! | pagination   | `data.pagination`, then top-level `pagination`                |
//! | item         | `data`, `data.note`/`data.todo`, a bare item                  |
//! | task         | `data.task`, `task`, `data`, a bare task                      |
//! | error        | `message`, `error`, `errors[].msg`                            |
//!
//! A body with `"success": false` is a failure even on a 2xx status. A task
//! without an id is rejected, so the store never caches one it cannot address.

use super::{DashboardPage, LoginResponse, Page, SearchPage};
use crate::error::{JotterError, Result};
use crate::model::{Item, Task, User};
use crate::pagination::PaginationPatch;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const GENERIC_FAILURE: &str = "Something went wrong";
const SESSION_EXPIRED: &str = "Session expired, please log in again";

/// Maps a non-2xx response to the client's error taxonomy.
pub fn error_from_status(status: u16, body: &Value) -> JotterError {
    match status {
        401 | 403 => JotterError::Unauthorized(message_or(body, SESSION_EXPIRED)),
        404 => JotterError::NotFound(message_or(body, "Not found")),
        422 => JotterError::Validation(validation_messages(body)),
        400..=499 => JotterError::Validation(vec![message_or(body, GENERIC_FAILURE)]),
        _ => JotterError::Server(message_or(body, GENERIC_FAILURE)),
    }
}

fn message_or(body: &Value, fallback: &str) -> String {
    error_message(body).unwrap_or_else(|| fallback.to_string())
}

/// First human-readable message in an error body.
pub fn error_message(body: &Value) -> Option<String> {
    let text = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    text(body.get("message"))
        .or_else(|| text(body.get("error")))
        .or_else(|| field_messages(body).into_iter().next())
}

/// Every field-level message, falling back to the single message.
pub fn validation_messages(body: &Value) -> Vec<String> {
    let fields = field_messages(body);
    if !fields.is_empty() {
        return fields;
    }
    vec![error_message(body).unwrap_or_else(|| GENERIC_FAILURE.to_string())]
}

fn field_messages(body: &Value) -> Vec<String> {
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("msg").or_else(|| e.get("message")).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn ensure_success(body: &Value) -> Result<()> {
    match body.get("success").and_then(Value::as_bool) {
        Some(false) => Err(JotterError::Validation(validation_messages(body))),
        _ => Ok(()),
    }
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| JotterError::Protocol(format!("invalid {what}: {e}")))
}

fn pagination(body: &Value) -> Result<Option<PaginationPatch>> {
    let raw = body
        .get("data")
        .and_then(|d| d.get("pagination"))
        .or_else(|| body.get("pagination"))
        .filter(|v| v.is_object());
    raw.cloned().map(|v| decode(v, "pagination")).transpose()
}

fn decode_items<T: DeserializeOwned>(raw: Option<&Value>, what: &str) -> Result<Vec<T>> {
    match raw.and_then(Value::as_array) {
        None => Ok(Vec::new()),
        Some(values) => values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| decode(v.clone(), what))
            .collect(),
    }
}

/// Normalizes a list response to `{items, pagination}`.
pub fn list_page<T: Item>(body: Value) -> Result<Page<T>> {
    ensure_success(&body)?;
    let plural = T::KIND.plural();
    let data = body.get("data");
    let raw = data
        .and_then(|d| d.get(plural))
        .or_else(|| data.and_then(|d| d.get("items")))
        .or_else(|| data.filter(|d| d.is_array()))
        .or_else(|| body.get(plural))
        .or_else(|| body.get("items"));

    Ok(Page {
        items: decode_items(raw, plural)?,
        pagination: pagination(&body)?,
    })
}

/// Takes this kind's half of the combined pinned response. The endpoint is
/// not paginated.
pub fn pinned_page<T: Item>(body: Value) -> Result<Page<T>> {
    ensure_success(&body)?;
    let plural = T::KIND.plural();
    let data = body.get("data").unwrap_or(&body);
    Ok(Page {
        items: decode_items(data.get(plural), plural)?,
        pagination: None,
    })
}

fn count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn dashboard(body: Value) -> Result<DashboardPage> {
    ensure_success(&body)?;
    let data = body.get("data").unwrap_or(&body);
    let items = data.get("items");
    let pinned = data.get("pinned");
    let totals = data.get("pagination").or_else(|| body.get("pagination"));
    Ok(DashboardPage {
        notes: decode_items(items.and_then(|i| i.get("notes")), "notes")?,
        todos: decode_items(items.and_then(|i| i.get("todos")), "todos")?,
        pinned_notes: decode_items(pinned.and_then(|p| p.get("notes")), "notes")?,
        pinned_todos: decode_items(pinned.and_then(|p| p.get("todos")), "todos")?,
        pagination: pagination(&body)?,
        total_notes: count(totals.and_then(|t| t.get("totalNotes"))),
        total_todos: count(totals.and_then(|t| t.get("totalTodos"))),
    })
}

/// Unwraps the item out of a mutation or fetch envelope.
pub fn item_envelope<T: Item>(body: Value) -> Result<T> {
    ensure_success(&body)?;
    let singular = T::KIND.to_string();
    let nested = match body.get("data") {
        Some(data) => Some(data.get(singular.as_str()).unwrap_or(data).clone()),
        None => body.get(singular.as_str()).cloned(),
    };
    let raw = nested.unwrap_or(body);
    if raw.get("id").is_none() {
        return Err(JotterError::Protocol(format!("{singular} response carries no id")));
    }
    decode(raw, &singular)
}

pub fn task(body: Value) -> Result<Task> {
    ensure_success(&body)?;
    let raw = body
        .get("data")
        .and_then(|d| d.get("task"))
        .or_else(|| body.get("task"))
        .or_else(|| body.get("data"))
        .cloned()
        .unwrap_or(body);

    let invalid = || JotterError::Protocol("Invalid task data received from server".to_string());
    let task: Task = serde_json::from_value(raw).map_err(|_| invalid())?;
    if task.id.is_empty() {
        return Err(invalid());
    }
    Ok(task)
}

pub fn search_page(body: Value) -> Result<SearchPage> {
    ensure_success(&body)?;
    let data = body.get("data").unwrap_or(&body);
    Ok(SearchPage {
        notes: decode_items(data.get("notes"), "notes")?,
        todos: decode_items(data.get("todos"), "todos")?,
        pagination: pagination(&body)?,
    })
}

pub fn login(body: Value) -> Result<LoginResponse> {
    ensure_success(&body)?;
    let nested = body.get("data").filter(|d| d.get("token").is_some()).cloned();
    let raw = nested.unwrap_or(body);
    decode(raw, "login response")
}

/// The user record returned by a profile update.
pub fn user(body: Value) -> Result<User> {
    ensure_success(&body)?;
    let raw = body
        .get("user")
        .or_else(|| body.get("data").and_then(|d| d.get("user")))
        .or_else(|| body.get("data"))
        .cloned()
        .ok_or_else(|| JotterError::Protocol("profile response carries no user".to_string()))?;
    decode(raw, "user")
}

/// The confirmation of a password change, or the default wording.
pub fn password_changed(body: Value) -> Result<String> {
    ensure_success(&body)?;
    Ok(body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or("Password changed successfully")
        .to_string())
}

/// Reads the stored autosave preference back from the service.
pub fn autosave(body: Value, requested: bool) -> Result<bool> {
    ensure_success(&body)?;
    let data = body.get("data");
    let value = body
        .get("autosave")
        .or_else(|| data.and_then(|d| d.get("autosave")))
        .or_else(|| data.and_then(|d| d.get("user")).and_then(|u| u.get("autosave")))
        .or_else(|| body.get("user").and_then(|u| u.get("autosave")));
    Ok(match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => requested,
    })
}
