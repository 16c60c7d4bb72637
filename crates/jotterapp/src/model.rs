//! # Domain Model: Notes, Todos and Tasks
//!
//! The service manages two kinds of items, [`Note`] and [`Todo`]. Both share a
//! common header, [`ItemMeta`], carrying the identity, title, timestamps and the
//! three lifecycle flags. Everything the client does generically (caching,
//! ordering, lifecycle moves) goes through the [`Item`] trait, so the rules are
//! written once and instantiated per kind.
//!
//! ## Lifecycle Flags
//!
//! - `isPinned`: priority flag, orthogonal to everything else.
//! - `isArchived` / `isTrash`: select the [`Partition`] the item lives in.
//!
//! `isArchived` and `isTrash` are mutually exclusive. When the service sends
//! both, the item is treated as trashed and the inconsistency is logged.
//!
//! ## Identifiers
//!
//! Ids are minted by the service and are opaque to the client. Some backends
//! emit numeric ids, others strings; [`ItemId`] accepts both and always holds
//! the textual form.
//!
//! ## Tasks
//!
//! A [`Task`] belongs to exactly one [`Todo`] and is only ever rendered through
//! its parent. Task mutations go through the store's task sub-collection so
//! that every cached copy of the parent stays in sync.

use crate::de;
use crate::store::{ClientStore, PartitionedCollection};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const UNTITLED_NOTE: &str = "Untitled Note";
pub const UNTITLED_TODO: &str = "Untitled Todo List";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => ItemId(s),
            Raw::Number(n) => ItemId(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Note,
    Todo,
}

impl ItemKind {
    /// Path segment and collection key used by the service (`notes`, `todos`).
    pub fn plural(self) -> &'static str {
        match self {
            ItemKind::Note => "notes",
            ItemKind::Todo => "todos",
        }
    }

    /// Capitalized name for user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Note => "Note",
            ItemKind::Todo => "Todo",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Note => f.write_str("note"),
            ItemKind::Todo => f.write_str("todo"),
        }
    }
}

/// The three mutually exclusive lifecycle buckets an item can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Active,
    Archived,
    Trashed,
}

impl Partition {
    pub const ALL: [Partition; 3] = [Partition::Active, Partition::Archived, Partition::Trashed];

    /// Derives the partition from the server-reported flags.
    pub fn of(meta: &ItemMeta) -> Self {
        if meta.is_trash {
            if meta.is_archived {
                tracing::warn!(id = %meta.id, "item flagged archived and trashed, taking trashed");
            }
            Partition::Trashed
        } else if meta.is_archived {
            Partition::Archived
        } else {
            Partition::Active
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::Active => f.write_str("active"),
            Partition::Archived => f.write_str("archived"),
            Partition::Trashed => f.write_str("trashed"),
        }
    }
}

/// Fields shared by every item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMeta {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "is_pinned", deserialize_with = "de::flag")]
    pub is_pinned: bool,
    #[serde(default, alias = "is_archived", deserialize_with = "de::flag")]
    pub is_archived: bool,
    #[serde(
        default,
        alias = "is_trash",
        alias = "isTrashed",
        deserialize_with = "de::flag"
    )]
    pub is_trash: bool,
    #[serde(
        default,
        alias = "created_at",
        deserialize_with = "de::opt_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "updated_at",
        deserialize_with = "de::opt_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemMeta {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_pinned: false,
            is_archived: false,
            is_trash: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// The timestamp lists are ordered by: `updatedAt`, falling back to `createdAt`.
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// Behavior shared by notes and todos.
///
/// The store, the lifecycle engine and the remote boundary are all written
/// against this trait; `Note` and `Todo` are the only implementors.
pub trait Item:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ItemKind;

    /// Title used when the user saves without one.
    const UNTITLED: &'static str;

    /// Editable fields sent on create and update.
    type Draft: ItemDraft;

    fn meta(&self) -> &ItemMeta;
    fn meta_mut(&mut self) -> &mut ItemMeta;

    fn draft(&self) -> Self::Draft;

    /// Case-insensitive keyword match over the item's text.
    fn matches(&self, keyword: &str) -> bool;

    fn collection(store: &ClientStore) -> &PartitionedCollection<Self>;
    fn collection_mut(store: &mut ClientStore) -> &mut PartitionedCollection<Self>;

    fn into_any(self) -> AnyItem;

    fn id(&self) -> &ItemId {
        &self.meta().id
    }

    fn title(&self) -> &str {
        &self.meta().title
    }

    fn partition(&self) -> Partition {
        Partition::of(self.meta())
    }
}

/// Editable fields of an item, as sent on create and update.
pub trait ItemDraft: Clone + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static {
    fn title(&self) -> &str;
    fn set_title(&mut self, title: String);

    /// Fills in `fallback` when the title is blank.
    fn titled_or(mut self, fallback: &str) -> Self {
        if self.title().trim().is_empty() {
            self.set_title(fallback.to_string());
        }
        self
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Rich text, serialized as HTML.
    #[serde(default, deserialize_with = "nullable_string")]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

impl ItemDraft for NoteDraft {
    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: String) {
        self.title = title;
    }
}

impl Note {
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            meta: ItemMeta::new(id, title),
            content: content.into(),
        }
    }
}

impl Item for Note {
    const KIND: ItemKind = ItemKind::Note;
    const UNTITLED: &'static str = UNTITLED_NOTE;
    type Draft = NoteDraft;

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn draft(&self) -> NoteDraft {
        NoteDraft::new(self.meta.title.clone(), self.content.clone())
    }

    fn matches(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        contains_ci(&self.meta.title, &needle) || contains_ci(&self.content, &needle)
    }

    fn collection(store: &ClientStore) -> &PartitionedCollection<Self> {
        &store.notes
    }

    fn collection_mut(store: &mut ClientStore) -> &mut PartitionedCollection<Self> {
        &mut store.notes
    }

    fn into_any(self) -> AnyItem {
        AnyItem::Note(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(flatten)]
    pub meta: ItemMeta,
    #[serde(
        default,
        alias = "due_date",
        deserialize_with = "de::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::nullable_vec")]
    pub tasks: Vec<Task>,
}

/// Todo fields accepted by the service. The service expects `due_date` in
/// snake case on writes even though it reports `dueDate` on reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl TodoDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            due_date: None,
        }
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }
}

impl ItemDraft for TodoDraft {
    fn title(&self) -> &str {
        &self.title
    }

    fn set_title(&mut self, title: String) {
        self.title = title;
    }
}

impl Todo {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            meta: ItemMeta::new(id, title),
            due_date: None,
            tasks: Vec::new(),
        }
    }

    pub fn task(&self, task_id: &ItemId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == task_id)
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed).count()
    }
}

impl Item for Todo {
    const KIND: ItemKind = ItemKind::Todo;
    const UNTITLED: &'static str = UNTITLED_TODO;
    type Draft = TodoDraft;

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn draft(&self) -> TodoDraft {
        TodoDraft {
            title: self.meta.title.clone(),
            due_date: self.due_date,
        }
    }

    fn matches(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        contains_ci(&self.meta.title, &needle)
            || self.tasks.iter().any(|t| contains_ci(&t.title, &needle))
    }

    fn collection(store: &ClientStore) -> &PartitionedCollection<Self> {
        &store.todos
    }

    fn collection_mut(store: &mut ClientStore) -> &mut PartitionedCollection<Self> {
        &mut store.todos
    }

    fn into_any(self) -> AnyItem {
        AnyItem::Todo(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: ItemId,
    #[serde(default, alias = "text")]
    pub title: String,
    #[serde(
        default,
        alias = "is_completed",
        alias = "completed",
        deserialize_with = "de::flag"
    )]
    pub is_completed: bool,
    #[serde(default, alias = "todo_id", skip_serializing_if = "Option::is_none")]
    pub todo_id: Option<ItemId>,
}

impl Task {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            is_completed: false,
            todo_id: None,
        }
    }

    pub fn completed(mut self, done: bool) -> Self {
        self.is_completed = done;
        self
    }
}

/// Payload for creating a task under a todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub todo_id: ItemId,
    pub title: String,
    pub is_completed: bool,
}

/// Partial task update; absent fields are left untouched by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo_id: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
}

/// An item of either kind, for results that mix notes and todos.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnyItem {
    Note(Note),
    Todo(Todo),
}

impl AnyItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            AnyItem::Note(_) => ItemKind::Note,
            AnyItem::Todo(_) => ItemKind::Todo,
        }
    }

    pub fn meta(&self) -> &ItemMeta {
        match self {
            AnyItem::Note(n) => &n.meta,
            AnyItem::Todo(t) => &t.meta,
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.meta().id
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            AnyItem::Note(n) => Some(n),
            AnyItem::Todo(_) => None,
        }
    }

    pub fn as_todo(&self) -> Option<&Todo> {
        match self {
            AnyItem::Todo(t) => Some(t),
            AnyItem::Note(_) => None,
        }
    }
}

/// Authenticated user, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "user_id", alias = "userId")]
    pub id: ItemId,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "de::flag")]
    pub autosave: bool,
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
