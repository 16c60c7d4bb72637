//! In-process notes service.
//!
//! `MemRemote` implements the full [`RemoteService`] contract against JSON
//! documents held in memory. It answers in the same inconsistent shapes as the
//! real service (top-level vs nested pagination, bare vs wrapped items, tasks
//! under `data.task` or `task`) and runs every response through
//! [`normalize`], so the boundary adapter is exercised on every call.
//!
//! Test hooks:
//! - [`MemRemote::fail_next`] queues a one-shot failure of any error class.
//! - [`MemRemote::requests`] returns every request received, with its query
//!   parameters and the (tokio) instant it arrived.
//! - [`MemRemote::set_latency`] delays every response, for out-of-order and
//!   debounce scenarios under a paused clock.
//! - [`MemRemote::revoke_sessions`] expires every issued token.
//!
//! Timestamps come from a deterministic clock that starts at
//! 2024-01-01T00:00:00Z and advances one second per mutation.

use super::normalize;
use super::{
    AuthToken, Credentials, DashboardPage, DashboardQuery, ListQuery, ListSource, LoginResponse,
    Page, PasswordChange, ProfileUpdate, Registration, RemoteService, SearchPage, SearchQuery,
};
use crate::error::{JotterError, Result};
use crate::lifecycle::Action;
use crate::model::{Item, ItemId, ItemKind, Partition, Task, TaskDraft, TaskPatch, User};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

type Rejection = (u16, Value);
type Reply = std::result::Result<Value, Rejection>;

/// A failure to inject into the next request.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The request never reaches the service.
    Transport,
    /// 422 with one field message per entry.
    Validation(Vec<String>),
    /// 401.
    Unauthorized,
    /// 500.
    Server,
    /// Any status with a raw body.
    Status(u16, Value),
}

impl Failure {
    fn into_error(self) -> JotterError {
        match self {
            Failure::Transport => JotterError::Transport("connection refused".to_string()),
            Failure::Validation(messages) => {
                let errors: Vec<Value> = messages.iter().map(|m| json!({ "msg": m })).collect();
                normalize::error_from_status(422, &json!({ "errors": errors }))
            }
            Failure::Unauthorized => {
                normalize::error_from_status(401, &json!({ "message": "Invalid or expired token" }))
            }
            Failure::Server => {
                normalize::error_from_status(500, &json!({ "error": "Internal server error" }))
            }
            Failure::Status(status, body) => normalize::error_from_status(status, &body),
        }
    }
}

/// One request as seen by the service.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug)]
struct MemState {
    accounts: Vec<Account>,
    sessions: HashMap<String, ItemId>,
    notes: Vec<Value>,
    todos: Vec<Value>,
    next_id: u64,
    clock: DateTime<Utc>,
    failures: VecDeque<Failure>,
    requests: Vec<RecordedRequest>,
    latency: Duration,
}

impl Default for MemState {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            sessions: HashMap::new(),
            notes: Vec::new(),
            todos: Vec::new(),
            next_id: 1,
            clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
            failures: VecDeque::new(),
            requests: Vec::new(),
            latency: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemRemote {
    state: Mutex<MemState>,
}

fn reject(status: u16, message: impl Into<String>) -> Rejection {
    (status, json!({ "success": false, "message": message.into() }))
}

fn flag(doc: &Value, key: &str) -> bool {
    doc.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(Value::as_str)
}

fn doc_partition(doc: &Value) -> Partition {
    if flag(doc, "isTrash") {
        Partition::Trashed
    } else if flag(doc, "isArchived") {
        Partition::Archived
    } else {
        Partition::Active
    }
}

fn owned_by(doc: &Value, user: &ItemId) -> bool {
    doc.get("userId").and_then(Value::as_str) == Some(user.as_str())
}

fn text_matches(doc: &Value, needle: &str) -> bool {
    let field = |k: &str| {
        doc.get(k)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(needle))
    };
    field("title")
        || field("content")
        || doc
            .get("tasks")
            .and_then(Value::as_array)
            .is_some_and(|tasks| tasks.iter().any(|t| {
                t.get("title")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_lowercase().contains(needle))
            }))
}

fn to_params<S: Serialize>(value: &S) -> Vec<(String, String)> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn newest_first(docs: &mut [&Value]) {
    docs.sort_by(|a, b| {
        let a = a.get("updatedAt").and_then(Value::as_str).unwrap_or_default();
        let b = b.get("updatedAt").and_then(Value::as_str).unwrap_or_default();
        b.cmp(a)
    });
}

fn user_json(user: &User) -> Value {
    json!({
        "user_id": user.id,
        "firstname": user.firstname,
        "lastname": user.lastname,
        "email": user.email,
        "autosave": user.autosave,
    })
}

fn page_bounds(total: usize, page: u32, limit: u32) -> (usize, usize, u32) {
    let limit = limit.max(1) as usize;
    let total_pages = total.div_ceil(limit).max(1) as u32;
    let start = (page.max(1) as usize - 1) * limit;
    let start = start.min(total);
    let end = (start + limit).min(total);
    (start, end, total_pages)
}

impl MemState {
    fn docs(&self, kind: ItemKind) -> &Vec<Value> {
        match kind {
            ItemKind::Note => &self.notes,
            ItemKind::Todo => &self.todos,
        }
    }

    fn docs_mut(&mut self, kind: ItemKind) -> &mut Vec<Value> {
        match kind {
            ItemKind::Note => &mut self.notes,
            ItemKind::Todo => &mut self.todos,
        }
    }

    fn tick(&mut self) -> String {
        self.clock += ChronoDuration::seconds(1);
        self.clock.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn mint_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn doc_mut(
        &mut self,
        kind: ItemKind,
        id: &ItemId,
        user: &ItemId,
    ) -> std::result::Result<&mut Value, Rejection> {
        self.docs_mut(kind)
            .iter_mut()
            .find(|d| doc_id(d) == Some(id.as_str()) && owned_by(d, user))
            .ok_or_else(|| reject(404, format!("{} not found", kind.label())))
    }

    fn authenticate(
        &self,
        auth: Option<&AuthToken>,
    ) -> std::result::Result<Option<ItemId>, Rejection> {
        match auth {
            None => Ok(None),
            Some(token) => self
                .sessions
                .get(token.expose())
                .cloned()
                .map(Some)
                .ok_or_else(|| reject(401, "Invalid or expired token")),
        }
    }

    fn insert_doc(&mut self, kind: ItemKind, user: &ItemId, fields: Map<String, Value>) -> Value {
        let id = self.mint_id();
        let now = self.tick();
        let mut doc = Map::new();
        doc.insert("id".into(), json!(id));
        doc.insert("title".into(), json!(""));
        match kind {
            ItemKind::Note => {
                doc.insert("content".into(), json!(""));
            }
            ItemKind::Todo => {
                doc.insert("dueDate".into(), Value::Null);
                doc.insert("tasks".into(), json!([]));
            }
        }
        doc.insert("isPinned".into(), json!(false));
        doc.insert("isArchived".into(), json!(false));
        doc.insert("isTrash".into(), json!(false));
        doc.insert("userId".into(), json!(user.as_str()));
        doc.insert("createdAt".into(), json!(now));
        doc.insert("updatedAt".into(), json!(now));
        let mut doc = Value::Object(doc);
        apply_fields(&mut doc, fields);
        self.docs_mut(kind).insert(0, doc.clone());
        doc
    }

    fn account_mut(&mut self, user: &ItemId) -> std::result::Result<&mut Account, Rejection> {
        self.accounts
            .iter_mut()
            .find(|a| &a.user.id == user)
            .ok_or_else(|| reject(404, "User not found"))
    }

    fn list(
        &self,
        kind: ItemKind,
        partition: Partition,
        query: &ListQuery,
        user: &ItemId,
    ) -> Reply {
        let mut matching: Vec<&Value> = self
            .docs(kind)
            .iter()
            .filter(|d| owned_by(d, user) && doc_partition(d) == partition)
            .filter(|d| {
                query
                    .keyword
                    .as_deref()
                    .map_or(true, |k| text_matches(d, &k.to_lowercase()))
            })
            .collect();

        let key = match query.sort_by.as_str() {
            "created_at" | "createdAt" => "createdAt",
            "title" => "title",
            _ => "updatedAt",
        };
        matching.sort_by(|a, b| {
            let a = a.get(key).and_then(Value::as_str).unwrap_or_default();
            let b = b.get(key).and_then(Value::as_str).unwrap_or_default();
            if query.sort_order.eq_ignore_ascii_case("ASC") {
                a.cmp(b)
            } else {
                b.cmp(a)
            }
        });

        let total = matching.len();
        let (start, end, total_pages) = page_bounds(total, query.page, query.limit);
        let items = &matching[start..end];
        let (has_next, has_prev) = (query.page < total_pages, query.page > 1);

        Ok(match partition {
            Partition::Active => json!({
                "success": true,
                "data": items,
                "pagination": {
                    "page": query.page,
                    "limit": query.limit,
                    "totalItems": total,
                    "totalPages": total_pages,
                    "hasNext": has_next,
                    "hasPrev": has_prev,
                }
            }),
            _ => {
                let mut data = Map::new();
                data.insert(kind.plural().to_string(), json!(items));
                data.insert(
                    "pagination".to_string(),
                    json!({ "currentPage": query.page, "total": total, "totalPages": total_pages }),
                );
                json!({ "success": true, "data": data })
            }
        })
    }

    fn pinned_docs(&self, kind: ItemKind, user: &ItemId) -> Vec<&Value> {
        let mut docs: Vec<&Value> = self
            .docs(kind)
            .iter()
            .filter(|d| owned_by(d, user) && flag(d, "isPinned"))
            .collect();
        newest_first(&mut docs);
        docs
    }

    /// Pinned items of both kinds in one body, as the home endpoint answers.
    fn pinned(&self, user: &ItemId) -> Reply {
        Ok(json!({
            "success": true,
            "data": {
                "notes": self.pinned_docs(ItemKind::Note, user),
                "todos": self.pinned_docs(ItemKind::Todo, user),
            }
        }))
    }

    fn dashboard(&self, query: &DashboardQuery, user: &ItemId) -> Reply {
        let active = |kind: ItemKind| -> Vec<&Value> {
            if !query.includes(kind) {
                return Vec::new();
            }
            self.docs(kind)
                .iter()
                .filter(|d| owned_by(d, user) && doc_partition(d) == Partition::Active)
                .collect()
        };
        let notes = active(ItemKind::Note);
        let todos = active(ItemKind::Todo);
        let (total_notes, total_todos) = (notes.len(), todos.len());

        let mut hits: Vec<(ItemKind, &Value)> = notes
            .into_iter()
            .map(|d| (ItemKind::Note, d))
            .chain(todos.into_iter().map(|d| (ItemKind::Todo, d)))
            .collect();
        hits.sort_by(|(_, a), (_, b)| {
            let a = a.get("updatedAt").and_then(Value::as_str).unwrap_or_default();
            let b = b.get("updatedAt").and_then(Value::as_str).unwrap_or_default();
            b.cmp(a)
        });

        let total = hits.len();
        let (start, end, total_pages) = page_bounds(total, query.page, query.limit);
        let pick = |kind: ItemKind| -> Vec<&Value> {
            hits[start..end]
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, d)| *d)
                .collect()
        };

        Ok(json!({
            "success": true,
            "data": {
                "items": { "notes": pick(ItemKind::Note), "todos": pick(ItemKind::Todo) },
                "pinned": {
                    "notes": self.pinned_docs(ItemKind::Note, user),
                    "todos": self.pinned_docs(ItemKind::Todo, user),
                },
                "pagination": {
                    "page": query.page,
                    "limit": query.limit,
                    "totalItems": total,
                    "totalPages": total_pages,
                    "hasNext": query.page < total_pages,
                    "hasPrev": query.page > 1,
                    "totalNotes": total_notes,
                    "totalTodos": total_todos,
                },
            }
        }))
    }

    fn transition(&mut self, kind: ItemKind, id: &ItemId, action: Action, user: &ItemId) -> Reply {
        let now = self.tick();
        let doc = self.doc_mut(kind, id, user)?;
        let archived = flag(doc, "isArchived");
        let trash = flag(doc, "isTrash");
        let pinned = flag(doc, "isPinned");
        let label = kind.label();
        let (archived, trash, pinned) = match action {
            Action::Archive if trash => {
                return Err(reject(400, format!("Cannot archive a trashed {kind}")));
            }
            Action::Archive => (true, false, pinned),
            Action::Unarchive => (false, trash, pinned),
            Action::Trash => (false, true, pinned),
            Action::Restore => (false, false, pinned),
            Action::TogglePin => (archived, trash, !pinned),
            Action::Delete => {
                return Err(reject(400, format!("{label} cannot be deleted this way")));
            }
        };
        doc["isArchived"] = json!(archived);
        doc["isTrash"] = json!(trash);
        doc["isPinned"] = json!(pinned);
        doc["updatedAt"] = json!(now);
        Ok(json!({ "success": true, "data": doc.clone() }))
    }

    fn search(&self, query: &SearchQuery, page: u32, limit: u32, user: &ItemId) -> Reply {
        let needle = query.keyword.trim().to_lowercase();
        let in_scope = |d: &Value| match query.category {
            Some(p) => doc_partition(d) == p,
            None => doc_partition(d) != Partition::Trashed,
        };
        let mut hits: Vec<(ItemKind, &Value)> = [ItemKind::Note, ItemKind::Todo]
            .into_iter()
            .filter(|k| query.includes(*k))
            .flat_map(|k| self.docs(k).iter().map(move |d| (k, d)))
            .filter(|(_, d)| owned_by(d, user) && in_scope(d) && text_matches(d, &needle))
            .collect();
        hits.sort_by(|(_, a), (_, b)| {
            let a = a.get("updatedAt").and_then(Value::as_str).unwrap_or_default();
            let b = b.get("updatedAt").and_then(Value::as_str).unwrap_or_default();
            b.cmp(a)
        });

        let total = hits.len();
        let (start, end, total_pages) = page_bounds(total, page, limit);
        let pick = |kind: ItemKind| -> Vec<&Value> {
            hits[start..end]
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, d)| *d)
                .collect()
        };

        Ok(json!({
            "success": true,
            "data": {
                "notes": pick(ItemKind::Note),
                "todos": pick(ItemKind::Todo),
                "pagination": {
                    "page": page,
                    "limit": limit,
                    "totalItems": total,
                    "totalPages": total_pages,
                },
                "search": {
                    "keyword": query.keyword,
                    "type": query.type_param(),
                    "category": query.category_param(),
                },
            }
        }))
    }

    fn find_task_mut(&mut self, task_id: &ItemId, user: &ItemId) -> Option<(&mut Value, usize)> {
        self.todos
            .iter_mut()
            .filter(|d| owned_by(d, user))
            .find_map(|todo| {
                let index = todo
                    .get("tasks")
                    .and_then(Value::as_array)?
                    .iter()
                    .position(|t| t.get("id").and_then(Value::as_str) == Some(task_id.as_str()))?;
                Some((todo, index))
            })
    }
}

fn apply_fields(doc: &mut Value, fields: Map<String, Value>) {
    for (key, value) in fields {
        let key = match key.as_str() {
            "due_date" => "dueDate".to_string(),
            _ => key,
        };
        doc[key.as_str()] = value;
    }
}

fn draft_fields<D: Serialize>(draft: &D) -> std::result::Result<Map<String, Value>, Rejection> {
    match serde_json::to_value(draft) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(reject(400, "Invalid request body")),
    }
}

impl MemRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an account directly, bypassing the request log.
    pub fn add_user(&self, email: &str, password: &str, firstname: &str) -> ItemId {
        let mut state = self.lock();
        let id = ItemId::new(format!("u{}", state.accounts.len() + 1));
        state.accounts.push(Account {
            user: User {
                id: id.clone(),
                firstname: firstname.to_string(),
                lastname: String::new(),
                email: email.to_string(),
                autosave: true,
            },
            password: password.to_string(),
        });
        id
    }

    /// Inserts an item directly, bypassing the request log.
    pub fn seed<T: Item>(&self, owner: &ItemId, draft: &T::Draft) -> ItemId {
        let mut state = self.lock();
        let fields = draft_fields(draft).unwrap_or_default();
        let doc = state.insert_doc(T::KIND, owner, fields);
        ItemId::new(doc_id(&doc).unwrap_or_default())
    }

    /// Overwrites the lifecycle flags of a stored item.
    pub fn set_flags(
        &self,
        kind: ItemKind,
        id: &ItemId,
        archived: bool,
        trash: bool,
        pinned: bool,
    ) {
        let mut state = self.lock();
        if let Some(doc) = state
            .docs_mut(kind)
            .iter_mut()
            .find(|d| doc_id(d) == Some(id.as_str()))
        {
            doc["isArchived"] = json!(archived);
            doc["isTrash"] = json!(trash);
            doc["isPinned"] = json!(pinned);
        }
    }

    /// The service's current copy of an item.
    pub fn stored<T: Item>(&self, id: &ItemId) -> Option<T> {
        let state = self.lock();
        state
            .docs(T::KIND)
            .iter()
            .find(|d| doc_id(d) == Some(id.as_str()))
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    pub fn fail_next(&self, failure: Failure) {
        self.lock().failures.push_back(failure);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    pub fn revoke_sessions(&self) {
        self.lock().sessions.clear();
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.is(method, path))
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Records the request, waits out the configured latency, then runs the
    /// handler against the service state.
    async fn call<F>(
        &self,
        method: &'static str,
        path: String,
        params: Vec<(String, String)>,
        auth: Option<&AuthToken>,
        handler: F,
    ) -> Result<Value>
    where
        F: FnOnce(&mut MemState, Option<ItemId>) -> Reply + Send,
    {
        tracing::debug!(method, %path, "mem request");
        let latency = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                method,
                path,
                params,
                at: Instant::now(),
            });
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.respond(auth, handler)
    }

    fn respond<F>(&self, auth: Option<&AuthToken>, handler: F) -> Result<Value>
    where
        F: FnOnce(&mut MemState, Option<ItemId>) -> Reply,
    {
        let mut state = self.lock();
        if let Some(failure) = state.failures.pop_front() {
            return Err(failure.into_error());
        }
        let reply = state
            .authenticate(auth)
            .and_then(|user| handler(&mut *state, user));
        reply.map_err(|(status, body)| normalize::error_from_status(status, &body))
    }
}

fn require(user: Option<ItemId>) -> std::result::Result<ItemId, Rejection> {
    user.ok_or_else(|| reject(401, "Authentication required"))
}

#[async_trait]
impl RemoteService for MemRemote {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let email = credentials.email.clone();
        let password = credentials.password.clone();
        let body = self
            .call("POST", "/auth/login".into(), Vec::new(), None, move |state, _| {
                let account = state
                    .accounts
                    .iter()
                    .find(|a| a.user.email.eq_ignore_ascii_case(&email) && a.password == password)
                    .cloned()
                    .ok_or_else(|| (401, json!({ "error": "Invalid email or password" })))?;
                let token = Uuid::new_v4().to_string();
                state.sessions.insert(token.clone(), account.user.id.clone());
                Ok(json!({ "token": token, "user": user_json(&account.user) }))
            })
            .await?;
        normalize::login(body)
    }

    async fn register(&self, registration: &Registration) -> Result<()> {
        let reg = registration.clone();
        self.call("POST", "/auth/register".into(), Vec::new(), None, move |state, _| {
            let mut errors = Vec::new();
            if reg.firstname.trim().is_empty() {
                errors.push(json!({ "msg": "First name is required" }));
            }
            if !reg.email.contains('@') {
                errors.push(json!({ "msg": "Valid email is required" }));
            }
            if reg.password.len() < 6 {
                errors.push(json!({ "msg": "Password must be at least 6 characters" }));
            }
            if state.accounts.iter().any(|a| a.user.email.eq_ignore_ascii_case(&reg.email)) {
                errors.push(json!({ "msg": "Email already registered" }));
            }
            if !errors.is_empty() {
                return Err((422, json!({ "success": false, "errors": errors })));
            }
            let id = ItemId::new(format!("u{}", state.accounts.len() + 1));
            state.accounts.push(Account {
                user: User {
                    id,
                    firstname: reg.firstname,
                    lastname: reg.lastname,
                    email: reg.email,
                    autosave: true,
                },
                password: reg.password,
            });
            Ok(json!({ "success": true, "message": "User registered successfully" }))
        })
        .await?;
        Ok(())
    }

    async fn set_autosave(&self, auth: &AuthToken, enabled: bool) -> Result<bool> {
        let body = self
            .call("PUT", "/auth/autosave".into(), Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                state.account_mut(&user)?.user.autosave = enabled;
                Ok(json!({ "success": true, "autosave": enabled }))
            })
            .await?;
        normalize::autosave(body, enabled)
    }

    async fn update_profile(&self, auth: &AuthToken, profile: &ProfileUpdate) -> Result<User> {
        let profile = profile.clone();
        let body = self
            .call("PUT", "/auth/profile".into(), Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                let mut errors = Vec::new();
                if profile.firstname.trim().is_empty() {
                    errors.push(json!({ "msg": "First name is required" }));
                }
                if !profile.email.contains('@') {
                    errors.push(json!({ "msg": "Valid email is required" }));
                }
                let taken = state.accounts.iter().any(|a| {
                    a.user.id != user && a.user.email.eq_ignore_ascii_case(&profile.email)
                });
                if taken {
                    errors.push(json!({ "msg": "Email already registered" }));
                }
                if !errors.is_empty() {
                    return Err((422, json!({ "success": false, "errors": errors })));
                }
                let account = state.account_mut(&user)?;
                account.user.firstname = profile.firstname;
                account.user.lastname = profile.lastname;
                account.user.email = profile.email;
                Ok(json!({ "message": "Profile updated", "user": user_json(&account.user) }))
            })
            .await?;
        normalize::user(body)
    }

    async fn change_password(&self, auth: &AuthToken, change: &PasswordChange) -> Result<String> {
        let change = change.clone();
        let body = self
            .call("PUT", "/auth/password".into(), Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                if change.new_password.len() < 6 {
                    let errors = json!([{ "msg": "Password must be at least 6 characters" }]);
                    return Err((422, json!({ "success": false, "errors": errors })));
                }
                let account = state.account_mut(&user)?;
                if account.password != change.old_password {
                    return Err((400, json!({ "error": "Current password is incorrect" })));
                }
                account.password = change.new_password;
                Ok(json!({ "success": true, "message": "Password updated successfully" }))
            })
            .await?;
        normalize::password_changed(body)
    }

    async fn delete_account(&self, auth: &AuthToken) -> Result<()> {
        self.call("DELETE", "/auth/delete".into(), Vec::new(), Some(auth), move |state, user| {
            let user = require(user)?;
            state.account_mut(&user)?;
            state.accounts.retain(|a| a.user.id != user);
            state.sessions.retain(|_, owner| *owner != user);
            state.notes.retain(|d| !owned_by(d, &user));
            state.todos.retain(|d| !owned_by(d, &user));
            Ok(json!({ "success": true, "message": "Account deleted" }))
        })
        .await?;
        Ok(())
    }

    async fn list_items<T: Item>(
        &self,
        auth: &AuthToken,
        source: ListSource,
        query: &ListQuery,
    ) -> Result<Page<T>> {
        let path = source.path(T::KIND);
        let params = match source {
            ListSource::Pinned => query.user_scope(),
            ListSource::Partition(_) => to_params(query),
        };
        let q = query.clone();
        let body = self
            .call("GET", path, params, Some(auth), move |state, user| {
                let user = require(user)?;
                match source {
                    ListSource::Pinned => state.pinned(&user),
                    ListSource::Partition(p) => state.list(T::KIND, p, &q, &user),
                }
            })
            .await?;
        match source {
            ListSource::Pinned => normalize::pinned_page(body),
            ListSource::Partition(_) => normalize::list_page(body),
        }
    }

    async fn get_item<T: Item>(&self, auth: &AuthToken, id: &ItemId) -> Result<T> {
        let path = format!("/{}/{}", T::KIND.plural(), id);
        let id = id.clone();
        let body = self
            .call("GET", path, Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                let doc = state.doc_mut(T::KIND, &id, &user)?;
                Ok(json!({ "success": true, "data": doc.clone() }))
            })
            .await?;
        normalize::item_envelope(body)
    }

    async fn create_item<T: Item>(&self, auth: &AuthToken, draft: &T::Draft) -> Result<T> {
        let path = format!("/{}", T::KIND.plural());
        let fields = draft_fields(draft);
        let body = self
            .call("POST", path, Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                let fields = fields?;
                if fields.get("title").and_then(Value::as_str).is_none() {
                    return Err((422, json!({ "errors": [{ "msg": "Title is required" }] })));
                }
                let doc = state.insert_doc(T::KIND, &user, fields);
                Ok(json!({ "success": true, "data": doc }))
            })
            .await?;
        normalize::item_envelope(body)
    }

    async fn update_item<T: Item>(
        &self,
        auth: &AuthToken,
        id: &ItemId,
        draft: &T::Draft,
    ) -> Result<T> {
        let path = format!("/{}/{}", T::KIND.plural(), id);
        let fields = draft_fields(draft);
        let id = id.clone();
        let body = self
            .call("PUT", path, Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                let fields = fields?;
                let now = state.tick();
                let doc = state.doc_mut(T::KIND, &id, &user)?;
                apply_fields(doc, fields);
                doc["updatedAt"] = json!(now);
                Ok(json!({ "success": true, "data": doc.clone() }))
            })
            .await?;
        normalize::item_envelope(body)
    }

    async fn transition<T: Item>(
        &self,
        auth: &AuthToken,
        id: &ItemId,
        action: Action,
    ) -> Result<T> {
        let segment = action.endpoint().unwrap_or("delete");
        let path = format!("/{}/{}/{}", T::KIND.plural(), id, segment);
        let id = id.clone();
        let body = self
            .call("PUT", path, Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                state.transition(T::KIND, &id, action, &user)
            })
            .await?;
        normalize::item_envelope(body)
    }

    async fn delete_item<T: Item>(&self, auth: &AuthToken, id: &ItemId) -> Result<()> {
        let path = format!("/{}/{}", T::KIND.plural(), id);
        let id = id.clone();
        self.call("DELETE", path, Vec::new(), Some(auth), move |state, user| {
            let user = require(user)?;
            let docs = state.docs_mut(T::KIND);
            let before = docs.len();
            docs.retain(|d| !(doc_id(d) == Some(id.as_str()) && owned_by(d, &user)));
            if docs.len() == before {
                return Err(reject(404, format!("{} not found", T::KIND.label())));
            }
            Ok(Value::Null)
        })
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        auth: &AuthToken,
        query: &SearchQuery,
        page: u32,
        limit: u32,
    ) -> Result<SearchPage> {
        let params = vec![
            ("keyword".to_string(), query.keyword.clone()),
            ("type".to_string(), query.type_param().to_string()),
            ("category".to_string(), query.category_param().to_string()),
            ("page".to_string(), page.to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let q = query.clone();
        let body = self
            .call("GET", "/home/search".into(), params, Some(auth), move |state, user| {
                let user = require(user)?;
                state.search(&q, page, limit, &user)
            })
            .await?;
        normalize::search_page(body)
    }

    async fn dashboard(&self, auth: &AuthToken, query: &DashboardQuery) -> Result<DashboardPage> {
        let q = query.clone();
        let body = self
            .call("GET", "/home/dashboard".into(), query.params(), Some(auth), move |state, user| {
                let user = require(user)?;
                state.dashboard(&q, &user)
            })
            .await?;
        normalize::dashboard(body)
    }

    async fn create_task(&self, auth: &AuthToken, draft: &TaskDraft) -> Result<Task> {
        let draft = draft.clone();
        let body = self
            .call("POST", "/tasks".into(), Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                if draft.title.trim().is_empty() {
                    return Err((422, json!({ "errors": [{ "msg": "Task title is required" }] })));
                }
                let task_id = state.mint_id();
                let now = state.tick();
                let todo = state.doc_mut(ItemKind::Todo, &draft.todo_id, &user)?;
                let task = json!({
                    "id": task_id,
                    "title": draft.title,
                    "isCompleted": draft.is_completed,
                    "todoId": draft.todo_id,
                });
                if let Some(tasks) = todo.get_mut("tasks").and_then(Value::as_array_mut) {
                    tasks.push(task.clone());
                }
                todo["updatedAt"] = json!(now);
                Ok(json!({ "success": true, "data": { "task": task } }))
            })
            .await?;
        normalize::task(body)
    }

    async fn update_task(&self, auth: &AuthToken, id: &ItemId, patch: &TaskPatch) -> Result<Task> {
        let path = format!("/tasks/{id}");
        let id = id.clone();
        let patch = patch.clone();
        let body = self
            .call("PUT", path, Vec::new(), Some(auth), move |state, user| {
                let user = require(user)?;
                let now = state.tick();
                let (todo, index) = state
                    .find_task_mut(&id, &user)
                    .ok_or_else(|| reject(404, "Task not found"))?;
                todo["updatedAt"] = json!(now);
                let task = &mut todo["tasks"][index];
                if let Some(title) = patch.title {
                    task["title"] = json!(title);
                }
                if let Some(done) = patch.is_completed {
                    task["isCompleted"] = json!(done);
                }
                Ok(json!({ "task": task.clone() }))
            })
            .await?;
        normalize::task(body)
    }

    async fn delete_task(&self, auth: &AuthToken, id: &ItemId) -> Result<()> {
        let path = format!("/tasks/{id}");
        let id = id.clone();
        self.call("DELETE", path, Vec::new(), Some(auth), move |state, user| {
            let user = require(user)?;
            let now = state.tick();
            let (todo, index) = state
                .find_task_mut(&id, &user)
                .ok_or_else(|| reject(404, "Task not found"))?;
            if let Some(tasks) = todo.get_mut("tasks").and_then(Value::as_array_mut) {
                tasks.remove(index);
            }
            todo["updatedAt"] = json!(now);
            Ok(json!({ "success": true, "message": "Task deleted" }))
        })
        .await?;
        Ok(())
    }
}
