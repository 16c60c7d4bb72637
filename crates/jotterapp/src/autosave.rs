//! # Autosave
//!
//! An editor keeps typing local until the user stops for a quiet period
//! (`autosave_delay_ms`, one second by default). Every edit restarts the
//! timer, so a burst of edits turns into one save request sent one quiet
//! period after the last edit.
//!
//! ## Cancellation
//!
//! Closing an editor cancels a timer that has not fired yet. A save that is
//! already on the wire is allowed to finish and its item still reaches the
//! store, but the closed editor ignores the outcome: no dirty-state update and
//! no notice.
//!
//! ## Ordering
//!
//! Saves of one editor run one at a time. That matters for a new item: the
//! first save creates it and every later save updates the id it was given.

use crate::api::JotterApi;
use crate::commands::{CmdMessage, CmdResult};
use crate::model::{Item, ItemId};
use crate::remote::RemoteService;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delays an action until its trigger has been quiet for `quiet`.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Replaces any pending action with `action`, due one quiet period from
    /// now. Once due, the action runs detached: cancelling afterwards does not
    /// abort it.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            tokio::spawn(action);
        }));
    }

    /// Drops the pending action, if its timer has not fired.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
struct EditState<T: Item> {
    id: Option<ItemId>,
    draft: T::Draft,
    /// Last draft the service confirmed.
    saved: Option<T::Draft>,
    open: bool,
}

#[derive(Debug)]
struct Shared<T: Item> {
    state: Mutex<EditState<T>>,
    /// Held for the whole of a save so saves never overlap.
    saving: tokio::sync::Mutex<()>,
}

impl<T: Item> Shared<T> {
    fn state(&self) -> MutexGuard<'_, EditState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An editing view over one item.
///
/// Results of saves (including autosaves) arrive on [`EditSession::next_notice`]
/// as ordinary [`CmdResult`]s, one per save.
pub struct EditSession<R: RemoteService, T: Item> {
    api: JotterApi<R>,
    shared: Arc<Shared<T>>,
    debouncer: Debouncer,
    notices_tx: mpsc::UnboundedSender<CmdResult>,
    notices_rx: mpsc::UnboundedReceiver<CmdResult>,
}

impl<R: RemoteService + 'static, T: Item> EditSession<R, T> {
    fn start(
        api: JotterApi<R>,
        id: Option<ItemId>,
        draft: T::Draft,
        saved: Option<T::Draft>,
    ) -> Self {
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let quiet = api.config().autosave_delay();
        Self {
            api,
            shared: Arc::new(Shared {
                state: Mutex::new(EditState {
                    id,
                    draft,
                    saved,
                    open: true,
                }),
                saving: tokio::sync::Mutex::new(()),
            }),
            debouncer: Debouncer::new(quiet),
            notices_tx,
            notices_rx,
        }
    }

    /// Edits an item the service already has. It becomes the selected item.
    pub(crate) fn open(api: JotterApi<R>, item: T) -> Self {
        let draft = item.draft();
        let id = item.id().clone();
        api.store().write(|s| s.set_selected(Some(item)));
        Self::start(api, Some(id), draft.clone(), Some(draft))
    }

    /// Edits a new item. Nothing is sent until the first save.
    pub(crate) fn compose(api: JotterApi<R>, draft: T::Draft) -> Self {
        api.store().write(|s| s.set_selected::<T>(None));
        Self::start(api, None, draft, None)
    }

    pub fn id(&self) -> Option<ItemId> {
        self.shared.state().id.clone()
    }

    pub fn draft(&self) -> T::Draft {
        self.shared.state().draft.clone()
    }

    /// Whether the current draft differs from what the service last confirmed.
    pub fn is_dirty(&self) -> bool {
        let state = self.shared.state();
        state.saved.as_ref() != Some(&state.draft)
    }

    /// Records an edit. With autosave on, a save is (re)scheduled.
    pub fn edit(&mut self, draft: T::Draft) {
        self.shared.state().draft = draft;
        if self.api.autosave_enabled() {
            let save = save(self.api.clone(), Arc::clone(&self.shared), self.notices_tx.clone());
            self.debouncer.schedule(save);
        }
    }

    /// Cancels the timer and saves right away. Returns the save's result.
    pub async fn save_now(&mut self) -> CmdResult {
        self.debouncer.cancel();
        let (tx, mut rx) = mpsc::unbounded_channel();
        save(self.api.clone(), Arc::clone(&self.shared), tx).await;
        rx.recv()
            .await
            .unwrap_or_else(|| CmdResult::message(CmdMessage::info("Nothing to save")))
    }

    /// Next autosave result, waiting for one if necessary.
    pub async fn next_notice(&mut self) -> Option<CmdResult> {
        self.notices_rx.recv().await
    }

    /// Leaves the editor. Pending timers are dropped and late results ignored.
    pub fn close(self) {
        drop(self);
    }
}

impl<R: RemoteService, T: Item> Drop for EditSession<R, T> {
    fn drop(&mut self) {
        self.debouncer.cancel();
        let id = {
            let mut state = self.shared.state();
            if !state.open {
                return;
            }
            state.open = false;
            state.id.clone()
        };
        self.api
            .store()
            .write(|s| s.collection_mut::<T>().clear_selected_if(id.as_ref()));
    }
}

/// Sends the current draft and reports the outcome on `notices`.
async fn save<R, T>(
    api: JotterApi<R>,
    shared: Arc<Shared<T>>,
    notices: mpsc::UnboundedSender<CmdResult>,
) where
    R: RemoteService + 'static,
    T: Item,
{
    let _saving = shared.saving.lock().await;
    let (id, draft) = {
        let state = shared.state();
        if !state.open || state.saved.as_ref() == Some(&state.draft) {
            return;
        }
        (state.id.clone(), state.draft.clone())
    };
    let creating = id.is_none();
    let outcome = api.save_draft::<T>(id.as_ref(), draft.clone()).await;

    let mut state = shared.state();
    if !state.open {
        tracing::debug!(kind = %T::KIND, "editor closed, save result ignored");
        return;
    }
    let result = match outcome {
        Ok(item) => {
            if creating {
                state.id = Some(item.id().clone());
            }
            state.saved = Some(draft);
            let verb = if creating { "created" } else { "updated" };
            let message = CmdMessage::success(format!("{} {verb} successfully", T::KIND.label()));
            api.store().write(|s| s.set_selected(Some(item.clone())));
            CmdResult::message(message).with_affected(vec![item.into_any()])
        }
        Err(err) => api.failure(err),
    };
    drop(state);
    // A dropped receiver only means nobody is listening any more.
    let _ = notices.send(result);
}
