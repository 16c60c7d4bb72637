//! # Command Layer
//!
//! The business operations of the client. Each command talks to the remote
//! service, and only when the service confirms does it write the returned data
//! into the store.
//!
//! ## Rules Every Command Follows
//!
//! - **Server truth**: the store receives the item the service returned, never
//!   a locally edited guess.
//! - **Nothing on failure**: if the request fails, the command returns the
//!   error before touching the store.
//! - **Refetch, don't place**: when `apply_transition` reports views the item
//!   moved into, the command refetches them. A failed refetch is logged and
//!   ignored; the action itself already succeeded.
//! - **One message**: a successful command adds exactly one message. Failures
//!   are turned into their single message by the API facade.
//!
//! ## What Commands Do NOT Do
//!
//! - No stdout/stderr, no terminal concerns.
//! - No session handling; they receive a ready [`Ctx`].
//!
//! ## Command Modules
//!
//! - [`fetch`]: paginated list fetches, page and page-size changes, refresh
//! - [`edit`]: open, create and update items
//! - [`lifecycle`]: archive, unarchive, trash, restore, pin, permanent delete
//! - [`tasks`]: task sub-collection of a todo
//! - [`search`]: keyword search across kinds
//! - [`home`]: the dashboard page of active items plus the pinned ones
//! - [`auth`]: login, register, profile, password, account deletion and the
//!   autosave preference

use crate::error::ErrorClass;
use crate::model::{AnyItem, ItemId};
use crate::pagination::Pagination;
use crate::remote::{AuthToken, RemoteService};
use crate::store::StoreHandle;
use serde::Serialize;

pub mod auth;
pub mod edit;
pub mod fetch;
pub mod home;
pub mod lifecycle;
pub mod search;
pub mod tasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Where the UI should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Redirect {
    /// The unauthenticated entry point.
    Login,
    /// Account creation, after the account was deleted.
    Register,
    Home,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CmdResult {
    pub messages: Vec<CmdMessage>,
    /// Items to display, in display order.
    pub listed: Vec<AnyItem>,
    /// Items the command created or changed, as confirmed by the service.
    pub affected: Vec<AnyItem>,
    pub pagination: Option<Pagination>,
    pub failure: Option<ErrorClass>,
    pub redirect: Option<Redirect>,
}

impl CmdResult {
    pub fn message(message: CmdMessage) -> Self {
        Self {
            messages: vec![message],
            ..Default::default()
        }
    }

    pub fn with_listed(mut self, items: Vec<AnyItem>) -> Self {
        self.listed = items;
        self
    }

    pub fn with_affected(mut self, items: Vec<AnyItem>) -> Self {
        self.affected = items;
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = Some(redirect);
        self
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Everything an authenticated command needs.
pub struct Ctx<'a, R: RemoteService> {
    pub remote: &'a R,
    pub store: &'a StoreHandle,
    pub auth: AuthToken,
    pub user_id: Option<ItemId>,
}

impl<'a, R: RemoteService> Ctx<'a, R> {
    pub fn new(
        remote: &'a R,
        store: &'a StoreHandle,
        auth: AuthToken,
        user_id: Option<ItemId>,
    ) -> Self {
        Self {
            remote,
            store,
            auth,
            user_id,
        }
    }
}
