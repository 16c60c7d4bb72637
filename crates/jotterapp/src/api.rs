//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for every jotter operation, whichever UI drives it.
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Owns the session**: builds each command's [`Ctx`] from the logged-in
//!   user's credential, or fails with `NotLoggedIn`.
//! - **Dispatches** to the matching command function.
//! - **Reports every outcome once**: a command's `Err` becomes a [`CmdResult`]
//!   carrying exactly one error message and the failure class, so a UI never
//!   has to decide between showing a notification and handling an error.
//!
//! ## Authorization Failures
//!
//! Any failure classed as authorization (an expired token, a revoked session,
//! no session at all) discards the credential and redirects to login. Cached
//! items stay where they are; only [`JotterApi::logout`] resets the store.
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **I/O**: no stdout, stderr, or files
//! - **Presentation**: returns data structures, not rendered text
//!
//! ## Generic Over RemoteService
//!
//! `JotterApi<R: RemoteService>` is generic over the service backend:
//! - Production: `JotterApi<HttpRemote>`
//! - Testing: `JotterApi<MemRemote>`

use crate::autosave::EditSession;
use crate::commands::{self, CmdMessage, CmdResult, Ctx, Redirect};
use crate::config::JotterConfig;
use crate::error::{ErrorClass, JotterError, Result};
use crate::lifecycle::Action;
use crate::model::{Item, ItemId, ItemKind, TaskPatch};
use crate::remote::{
    Credentials, HttpRemote, ProfileUpdate, Registration, RemoteService, SearchQuery,
};
use crate::session::{Session, SessionSlot};
use crate::store::{ClientStore, StoreHandle, View};
use std::sync::Arc;

/// Runs a command against a fresh [`Ctx`] and folds the outcome into a
/// [`CmdResult`].
macro_rules! authed {
    ($api:expr, $ctx:ident => $call:expr) => {{
        let result = match $api.ctx() {
            Ok($ctx) => $call.await,
            Err(err) => Err(err),
        };
        $api.finish(result)
    }};
}

/// The main API facade for jotter operations.
pub struct JotterApi<R: RemoteService> {
    remote: Arc<R>,
    store: StoreHandle,
    session: SessionSlot,
    config: JotterConfig,
}

impl<R: RemoteService> Clone for JotterApi<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            store: self.store.clone(),
            session: self.session.clone(),
            config: self.config.clone(),
        }
    }
}

impl JotterApi<HttpRemote> {
    /// Facade talking to the configured service over HTTP.
    pub fn connect(config: JotterConfig) -> Result<Self> {
        let remote = HttpRemote::new(&config.api_url, config.request_timeout())?;
        Ok(Self::new(remote, config))
    }
}

impl<R: RemoteService> JotterApi<R> {
    pub fn new(remote: R, config: JotterConfig) -> Self {
        Self {
            remote: Arc::new(remote),
            store: StoreHandle::new(ClientStore::new(config.store_settings())),
            session: SessionSlot::default(),
            config,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn config(&self) -> &JotterConfig {
        &self.config
    }

    pub fn session(&self) -> Option<Session> {
        self.session.get()
    }

    /// Adopts a session persisted by the UI.
    pub fn resume(&self, session: Session) {
        self.session.set(Some(session));
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    fn ctx(&self) -> Result<Ctx<'_, R>> {
        let session = self.session.get().ok_or(JotterError::NotLoggedIn)?;
        Ok(Ctx::new(
            &*self.remote,
            &self.store,
            session.token,
            Some(session.user.id),
        ))
    }

    fn finish(&self, result: Result<CmdResult>) -> CmdResult {
        match result {
            Ok(result) => result,
            Err(err) => self.failure(err),
        }
    }

    pub(crate) fn failure(&self, err: JotterError) -> CmdResult {
        let class = err.class();
        tracing::debug!(?class, error = %err, "command failed");
        let mut result = CmdResult::message(CmdMessage::error(err.to_string()));
        result.failure = Some(class);
        if class == ErrorClass::Authorization {
            if self.session.take().is_some() {
                tracing::warn!("session rejected, credential discarded");
            }
            result.redirect = Some(Redirect::Login);
        }
        result
    }

    // --- account ---

    pub async fn login(&self, email: &str, password: &str) -> CmdResult {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        match commands::auth::login(&*self.remote, &credentials).await {
            Ok((session, result)) => {
                self.session.set(Some(session));
                result
            }
            // A rejected login has no session to discard and stays on login.
            Err(err) => {
                let mut result = self.failure(err);
                result.redirect = None;
                result
            }
        }
    }

    pub async fn register(&self, registration: &Registration) -> CmdResult {
        let result = commands::auth::register(&*self.remote, registration).await;
        self.finish(result)
    }

    /// Ends the session and drops every cached item.
    pub fn logout(&self) -> CmdResult {
        self.session.take();
        self.store.write(|s| s.reset());
        CmdResult::message(CmdMessage::info("Logged out successfully"))
            .with_redirect(Redirect::Login)
    }

    /// Stores the preference the service confirmed; nothing changes locally
    /// until then.
    pub async fn set_autosave(&self, enabled: bool) -> CmdResult {
        let outcome = match self.ctx() {
            Ok(ctx) => commands::auth::set_autosave(&ctx, enabled).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok((confirmed, result)) => {
                self.session.set_autosave(confirmed);
                result
            }
            Err(err) => self.failure(err),
        }
    }

    pub fn autosave_enabled(&self) -> bool {
        self.session.autosave()
    }

    /// The session keeps the user record the service sent back.
    pub async fn update_profile(&self, profile: &ProfileUpdate) -> CmdResult {
        let outcome = match self.ctx() {
            Ok(ctx) => commands::auth::update_profile(&ctx, profile).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok((user, result)) => {
                self.session.set_user(user);
                result
            }
            Err(err) => self.failure(err),
        }
    }

    pub async fn change_password(&self, old: &str, new: &str, confirmation: &str) -> CmdResult {
        authed!(self, ctx => commands::auth::change_password(&ctx, old, new, confirmation))
    }

    /// Once the service confirms, the session and every cached item go.
    pub async fn delete_account(&self) -> CmdResult {
        let result = authed!(self, ctx => commands::auth::delete_account(&ctx));
        if !result.is_failure() {
            self.session.take();
            self.store.write(|s| s.reset());
        }
        result
    }

    // --- lists ---

    /// Fetches `page` of `view` using the view's current page size.
    pub async fn fetch<T: Item>(&self, view: View, page: u32) -> CmdResult {
        let limit = self.store.pagination::<T>(view).limit;
        authed!(self, ctx => commands::fetch::run::<T, R>(&ctx, view, page, limit))
    }

    pub async fn change_page<T: Item>(&self, view: View, page: u32) -> CmdResult {
        authed!(self, ctx => commands::fetch::change_page::<T, R>(&ctx, view, page))
    }

    pub async fn change_limit<T: Item>(&self, view: View, limit: u32) -> CmdResult {
        authed!(self, ctx => commands::fetch::change_limit::<T, R>(&ctx, view, limit))
    }

    pub async fn refresh<T: Item>(&self, view: View) -> CmdResult {
        authed!(self, ctx => commands::fetch::refresh::<T, R>(&ctx, view))
    }

    // --- home ---

    /// First page of the dashboard, optionally limited to one kind.
    pub async fn home(&self, kind: Option<ItemKind>) -> CmdResult {
        authed!(self, ctx => commands::home::run(&ctx, kind, 1))
    }

    pub async fn home_page(&self, page: u32) -> CmdResult {
        authed!(self, ctx => commands::home::change_page(&ctx, page))
    }

    // --- items ---

    pub async fn open<T: Item>(&self, id: &ItemId) -> CmdResult {
        authed!(self, ctx => commands::edit::open::<T, R>(&ctx, id))
    }

    pub async fn create<T: Item>(&self, draft: T::Draft) -> CmdResult {
        authed!(self, ctx => commands::edit::create::<T, R>(&ctx, draft))
    }

    pub async fn update<T: Item>(&self, id: &ItemId, draft: T::Draft) -> CmdResult {
        authed!(self, ctx => commands::edit::update::<T, R>(&ctx, id, draft))
    }

    pub async fn transition<T: Item>(&self, id: &ItemId, action: Action) -> CmdResult {
        authed!(self, ctx => commands::lifecycle::run::<T, R>(&ctx, id, action))
    }

    pub async fn archive<T: Item>(&self, id: &ItemId) -> CmdResult {
        self.transition::<T>(id, Action::Archive).await
    }

    pub async fn unarchive<T: Item>(&self, id: &ItemId) -> CmdResult {
        self.transition::<T>(id, Action::Unarchive).await
    }

    pub async fn trash<T: Item>(&self, id: &ItemId) -> CmdResult {
        self.transition::<T>(id, Action::Trash).await
    }

    pub async fn restore<T: Item>(&self, id: &ItemId) -> CmdResult {
        self.transition::<T>(id, Action::Restore).await
    }

    pub async fn toggle_pin<T: Item>(&self, id: &ItemId) -> CmdResult {
        self.transition::<T>(id, Action::TogglePin).await
    }

    pub async fn delete_permanently<T: Item>(&self, id: &ItemId) -> CmdResult {
        self.transition::<T>(id, Action::Delete).await
    }

    // --- tasks ---

    pub async fn add_task(&self, todo_id: &ItemId, title: &str) -> CmdResult {
        authed!(self, ctx => commands::tasks::add_task(&ctx, todo_id, title))
    }

    pub async fn update_task(
        &self,
        todo_id: &ItemId,
        task_id: &ItemId,
        patch: TaskPatch,
    ) -> CmdResult {
        authed!(self, ctx => commands::tasks::update_task(&ctx, todo_id, task_id, patch))
    }

    pub async fn set_task_completed(
        &self,
        todo_id: &ItemId,
        task_id: &ItemId,
        done: bool,
    ) -> CmdResult {
        authed!(self, ctx => commands::tasks::set_task_completed(&ctx, todo_id, task_id, done))
    }

    pub async fn rename_task(&self, todo_id: &ItemId, task_id: &ItemId, title: &str) -> CmdResult {
        authed!(self, ctx => commands::tasks::rename_task(&ctx, todo_id, task_id, title))
    }

    pub async fn remove_task(&self, todo_id: &ItemId, task_id: &ItemId) -> CmdResult {
        authed!(self, ctx => commands::tasks::remove_task(&ctx, todo_id, task_id))
    }

    // --- search ---

    pub async fn search(&self, query: SearchQuery) -> CmdResult {
        authed!(self, ctx => commands::search::run(&ctx, query, 1))
    }

    pub async fn search_page(&self, page: u32) -> CmdResult {
        authed!(self, ctx => commands::search::change_page(&ctx, page))
    }

    pub fn clear_search(&self) -> CmdResult {
        self.store.write(|s| s.clear_search());
        CmdResult::message(CmdMessage::info("Search cleared"))
    }

    pub(crate) async fn save_draft<T: Item>(
        &self,
        id: Option<&ItemId>,
        draft: T::Draft,
    ) -> Result<T> {
        let ctx = self.ctx()?;
        match id {
            Some(id) => commands::edit::update_quiet::<T, R>(&ctx, id, draft).await,
            None => commands::edit::create_quiet::<T, R>(&ctx, draft).await,
        }
    }
}

impl<R: RemoteService + 'static> JotterApi<R> {
    // --- editing ---

    /// Starts editing an existing item. The server copy is loaded first.
    pub async fn edit<T: Item>(
        &self,
        id: &ItemId,
    ) -> std::result::Result<EditSession<R, T>, CmdResult> {
        let opened = self.open::<T>(id).await;
        if opened.is_failure() {
            return Err(opened);
        }
        match self.store.selected::<T>() {
            Some(item) => Ok(EditSession::open(self.clone(), item)),
            None => Err(self.failure(JotterError::not_found(T::KIND, id))),
        }
    }

    /// Starts editing a new, unsaved item. The first save creates it.
    pub fn compose<T: Item>(&self, draft: T::Draft) -> EditSession<R, T> {
        EditSession::compose(self.clone(), draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::model::{Note, NoteDraft, Partition, Todo, TodoDraft};
    use crate::remote::memory::Failure;
    use crate::remote::MemRemote;
    use crate::test_utils::{EMAIL, PASSWORD};

    async fn logged_in_api() -> JotterApi<MemRemote> {
        let remote = MemRemote::new();
        remote.add_user(EMAIL, PASSWORD, "Ada");
        let api = JotterApi::new(remote, JotterConfig::default());
        let result = api.login(EMAIL, PASSWORD).await;
        assert!(!result.is_failure());
        api.remote().clear_requests();
        api
    }

    #[tokio::test]
    async fn commands_without_session_redirect_to_login() {
        let api = JotterApi::new(MemRemote::new(), JotterConfig::default());

        let result = api.fetch::<Note>(View::ACTIVE, 1).await;

        assert_eq!(result.failure, Some(ErrorClass::Authorization));
        assert_eq!(result.redirect, Some(Redirect::Login));
        assert_eq!(result.messages, vec![CmdMessage::error("Not logged in")]);
        assert!(api.remote().requests().is_empty());
    }

    #[tokio::test]
    async fn failed_login_stays_on_login_screen() {
        let remote = MemRemote::new();
        remote.add_user(EMAIL, PASSWORD, "Ada");
        let api = JotterApi::new(remote, JotterConfig::default());

        let result = api.login(EMAIL, "wrong").await;

        assert_eq!(result.failure, Some(ErrorClass::Authorization));
        assert!(result.redirect.is_none());
        assert!(!api.is_logged_in());
    }

    #[tokio::test]
    async fn every_failure_is_one_error_message() {
        let api = logged_in_api().await;
        api.remote()
            .fail_next(Failure::Validation(vec!["Title is required".into(), "Too long".into()]));

        let result = api.create::<Note>(NoteDraft::new("x", "")).await;

        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].level, MessageLevel::Error);
        assert_eq!(result.messages[0].content, "Title is required\nToo long");
        assert_eq!(result.failure, Some(ErrorClass::Validation));
        assert!(api.is_logged_in());
    }

    #[tokio::test]
    async fn expired_token_discards_credential_but_keeps_cache() {
        let api = logged_in_api().await;
        api.create::<Note>(NoteDraft::new("kept", "")).await;
        api.remote().revoke_sessions();

        let result = api.fetch::<Note>(View::ACTIVE, 1).await;

        assert_eq!(result.redirect, Some(Redirect::Login));
        assert!(!api.is_logged_in());
        assert_eq!(api.store().visible::<Note>(View::ACTIVE).len(), 1);
    }

    #[tokio::test]
    async fn logout_resets_the_store() {
        let api = logged_in_api().await;
        api.create::<Todo>(TodoDraft::new("t")).await;

        let result = api.logout();

        assert_eq!(result.messages, vec![CmdMessage::info("Logged out successfully")]);
        assert!(api.store().visible::<Todo>(View::ACTIVE).is_empty());
        assert!(!api.is_logged_in());
    }

    #[tokio::test]
    async fn autosave_preference_follows_the_server() {
        let api = logged_in_api().await;
        assert!(api.autosave_enabled());

        api.remote().fail_next(Failure::Server);
        let failed = api.set_autosave(false).await;
        assert!(failed.is_failure());
        assert!(api.autosave_enabled());

        let ok = api.set_autosave(false).await;
        assert_eq!(ok.messages[0].content, "AutoSave Disabled");
        assert!(!api.autosave_enabled());
    }

    #[tokio::test]
    async fn lifecycle_shortcuts_dispatch_the_right_action() {
        let api = logged_in_api().await;
        let created = api.create::<Note>(NoteDraft::new("n", "")).await;
        let id = created.affected[0].id().clone();

        api.archive::<Note>(&id).await;
        assert_eq!(
            api.store().read(|s| s.notes().partitions_of(&id)),
            vec![Partition::Archived]
        );
        assert!(api.remote().requests().iter().any(|r| r.path.ends_with("/archive")));

        let refused = api.delete_permanently::<Note>(&id).await;
        assert_eq!(refused.failure, Some(ErrorClass::Client));
    }

    #[tokio::test]
    async fn profile_update_refreshes_the_session_user() {
        let api = logged_in_api().await;
        let profile = ProfileUpdate {
            firstname: "Augusta".into(),
            lastname: "King".into(),
            email: "augusta@example.com".into(),
        };

        let result = api.update_profile(&profile).await;

        assert_eq!(result.messages[0].content, "Profile updated successfully");
        let user = api.session().unwrap().user;
        assert_eq!((user.firstname.as_str(), user.lastname.as_str()), ("Augusta", "King"));
        assert!(user.autosave);
    }

    #[tokio::test]
    async fn rejected_profile_update_keeps_the_old_user() {
        let api = logged_in_api().await;
        let profile = ProfileUpdate {
            firstname: String::new(),
            lastname: "King".into(),
            email: EMAIL.into(),
        };

        let result = api.update_profile(&profile).await;

        assert_eq!(result.failure, Some(ErrorClass::Validation));
        assert_eq!(api.session().unwrap().user.firstname, "Ada");
    }

    #[tokio::test]
    async fn password_mismatch_is_one_validation_message() {
        let api = logged_in_api().await;

        let result = api.change_password(PASSWORD, "secret99", "secret9").await;

        assert_eq!(result.failure, Some(ErrorClass::Validation));
        assert_eq!(
            result.messages,
            vec![CmdMessage::error("New password and confirmation do not match.")]
        );
        assert!(api.is_logged_in());
    }

    #[tokio::test]
    async fn deleting_the_account_ends_the_session() {
        let api = logged_in_api().await;
        api.create::<Note>(NoteDraft::new("gone", "")).await;

        let result = api.delete_account().await;

        assert_eq!(result.redirect, Some(Redirect::Register));
        assert!(!api.is_logged_in());
        assert!(api.store().visible::<Note>(View::ACTIVE).is_empty());
        assert!(api.login(EMAIL, PASSWORD).await.is_failure());
    }

    #[tokio::test]
    async fn failed_account_deletion_keeps_everything() {
        let api = logged_in_api().await;
        api.create::<Note>(NoteDraft::new("kept", "")).await;
        api.remote().fail_next(Failure::Server);

        let result = api.delete_account().await;

        assert_eq!(result.failure, Some(ErrorClass::Server));
        assert!(api.is_logged_in());
        assert_eq!(api.store().visible::<Note>(View::ACTIVE).len(), 1);
    }

    #[tokio::test]
    async fn home_pages_through_the_dashboard() {
        let api = logged_in_api().await;
        for i in 0..11 {
            api.create::<Todo>(TodoDraft::new(format!("t{i}"))).await;
        }
        api.remote().clear_requests();

        let first = api.home(Some(ItemKind::Todo)).await;
        assert_eq!(first.listed.len(), 10);
        let second = api.home_page(2).await;

        assert_eq!(second.listed.len(), 1);
        let requests = api.remote().requests_to("GET", "/home/dashboard");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].param("type"), Some("todo"));
    }
}
