//! # Remote Service Boundary
//!
//! Everything the client knows about the notes service goes through the
//! [`RemoteService`] trait. Implementations:
//!
//! - [`http::HttpRemote`]: the real REST client, built on `reqwest`.
//! - [`memory::MemRemote`]: an in-process service with the same contract,
//!   used by tests and offline demos.
//!
//! Both return canonical types only. The service's inconsistent response
//! shapes (pagination at the top level or under `data`, lists under `data`,
//! `data.items` or `data.notes`, tasks bare or wrapped) are folded into one
//! shape by [`normalize`] before anything reaches the store.
//!
//! ## Endpoints
//!
//! ```text
//! POST   /auth/login                      POST /auth/register
//! PUT    /auth/autosave                   PUT  /auth/profile     PUT /auth/password
//! DELETE /auth/delete
//! GET    /{notes|todos}[/archived|/trashed]?page&limit&sortBy&sortOrder&userId
//! GET    /{kind}/{id}                     PUT  /{kind}/{id}      DELETE /{kind}/{id}
//! POST   /{kind}
//! PUT    /{kind}/{id}/{trash|restore|archive|unarchive|toggle-pin}
//! GET    /home/search?keyword&type&category&page&limit
//! GET    /home/dashboard?type&page&limit&userId
//! GET    /home/pinned?userId              (both kinds in one response)
//! POST   /tasks                           PUT  /tasks/{id}       DELETE /tasks/{id}
//! ```

use crate::error::Result;
use crate::lifecycle::Action;
use crate::model::{Item, ItemId, ItemKind, Note, Partition, Task, TaskDraft, TaskPatch, Todo, User};
use crate::pagination::{PaginationPatch, DEFAULT_PAGE_SIZE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod http;
pub mod memory;
pub mod normalize;

pub use http::HttpRemote;
pub use memory::MemRemote;

/// Which list endpoint to query for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListSource {
    Partition(Partition),
    /// Pinned items of both kinds come from one endpoint; each kind keeps its
    /// own half of the answer.
    Pinned,
}

impl ListSource {
    pub fn path(self, kind: ItemKind) -> String {
        let plural = kind.plural();
        match self {
            ListSource::Partition(Partition::Active) => format!("/{plural}"),
            ListSource::Partition(Partition::Archived) => format!("/{plural}/archived"),
            ListSource::Partition(Partition::Trashed) => format!("/{plural}/trashed"),
            ListSource::Pinned => "/home/pinned".to_string(),
        }
    }
}

impl fmt::Display for ListSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSource::Partition(p) => write!(f, "{p}"),
            ListSource::Pinned => f.write_str("pinned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub sort_by: String,
    pub sort_order: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            sort_by: "updated_at".to_string(),
            sort_order: "DESC".to_string(),
            user_id: None,
            keyword: None,
        }
    }
}

impl ListQuery {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            ..Self::default()
        }
    }

    pub fn for_user(mut self, user_id: Option<ItemId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// The only parameter the pinned endpoint takes.
    pub fn user_scope(&self) -> Vec<(String, String)> {
        self.user_id
            .iter()
            .map(|id| ("userId".to_string(), id.to_string()))
            .collect()
    }
}

fn type_param(kind: Option<ItemKind>) -> &'static str {
    match kind {
        Some(ItemKind::Note) => "note",
        Some(ItemKind::Todo) => "todo",
        None => "all",
    }
}

/// Keyword search across both kinds, optionally narrowed to one kind and one
/// lifecycle partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub kind: Option<ItemKind>,
    pub category: Option<Partition>,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            kind: None,
            category: None,
        }
    }

    /// `type` query parameter: `note`, `todo` or `all`.
    pub fn type_param(&self) -> &'static str {
        type_param(self.kind)
    }

    /// `category` query parameter: a partition name or `all`.
    pub fn category_param(&self) -> &'static str {
        match self.category {
            Some(Partition::Active) => "active",
            Some(Partition::Archived) => "archived",
            Some(Partition::Trashed) => "trashed",
            None => "all",
        }
    }

    pub fn includes(&self, kind: ItemKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
    }
}

/// One page of the home dashboard: active items of one or both kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardQuery {
    pub kind: Option<ItemKind>,
    pub page: u32,
    pub limit: u32,
    pub user_id: Option<ItemId>,
}

impl DashboardQuery {
    pub fn new(kind: Option<ItemKind>, page: u32, limit: u32) -> Self {
        Self {
            kind,
            page: page.max(1),
            limit: limit.max(1),
            user_id: None,
        }
    }

    pub fn for_user(mut self, user_id: Option<ItemId>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn includes(&self, kind: ItemKind) -> bool {
        self.kind.map_or(true, |k| k == kind)
    }

    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("type".to_string(), type_param(self.kind).to_string()),
        ];
        if let Some(id) = &self.user_id {
            params.push(("userId".to_string(), id.to_string()));
        }
        params
    }
}

/// Bearer credential issued at login.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: AuthToken,
    pub user: User,
}

/// One page of a list endpoint, in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<PaginationPatch>,
}

/// One page of search results across both kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub notes: Vec<Note>,
    pub todos: Vec<Todo>,
    pub pagination: Option<PaginationPatch>,
}

/// The home dashboard in canonical form. Pagination is shared by both kinds;
/// the per-kind totals are only present when the service sends them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardPage {
    pub notes: Vec<Note>,
    pub todos: Vec<Todo>,
    pub pinned_notes: Vec<Note>,
    pub pinned_todos: Vec<Todo>,
    pub pagination: Option<PaginationPatch>,
    pub total_notes: Option<u64>,
    pub total_todos: Option<u64>,
}

/// Request/response contract of the notes service.
///
/// Every method either returns the canonical, server-confirmed value or an
/// error already classified into the client's error taxonomy.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;

    async fn register(&self, registration: &Registration) -> Result<()>;

    /// Returns the autosave value the service stored.
    async fn set_autosave(&self, auth: &AuthToken, enabled: bool) -> Result<bool>;

    /// Returns the user as the service stored it.
    async fn update_profile(&self, auth: &AuthToken, profile: &ProfileUpdate) -> Result<User>;

    /// Returns the service's confirmation message.
    async fn change_password(&self, auth: &AuthToken, change: &PasswordChange) -> Result<String>;

    async fn delete_account(&self, auth: &AuthToken) -> Result<()>;

    async fn list_items<T: Item>(
        &self,
        auth: &AuthToken,
        source: ListSource,
        query: &ListQuery,
    ) -> Result<Page<T>>;

    async fn get_item<T: Item>(&self, auth: &AuthToken, id: &ItemId) -> Result<T>;

    async fn create_item<T: Item>(&self, auth: &AuthToken, draft: &T::Draft) -> Result<T>;

    async fn update_item<T: Item>(&self, auth: &AuthToken, id: &ItemId, draft: &T::Draft)
        -> Result<T>;

    /// Lifecycle move. Not valid for [`Action::Delete`]; use [`Self::delete_item`].
    async fn transition<T: Item>(&self, auth: &AuthToken, id: &ItemId, action: Action)
        -> Result<T>;

    async fn delete_item<T: Item>(&self, auth: &AuthToken, id: &ItemId) -> Result<()>;

    async fn search(
        &self,
        auth: &AuthToken,
        query: &SearchQuery,
        page: u32,
        limit: u32,
    ) -> Result<SearchPage>;

    async fn dashboard(&self, auth: &AuthToken, query: &DashboardQuery) -> Result<DashboardPage>;

    async fn create_task(&self, auth: &AuthToken, draft: &TaskDraft) -> Result<Task>;

    async fn update_task(&self, auth: &AuthToken, id: &ItemId, patch: &TaskPatch) -> Result<Task>;

    async fn delete_task(&self, auth: &AuthToken, id: &ItemId) -> Result<()>;
}
