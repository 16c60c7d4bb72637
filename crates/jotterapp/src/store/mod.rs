//! # Client Store
//!
//! The store is the client-side mirror of the service's item collections. It
//! holds, per item kind, several redundant views of the same items:
//!
//! - three lifecycle partitions: active, archived, trashed
//! - the pinned view (items the service reported as pinned)
//! - the home view (the current dashboard page, active items only)
//! - the search view (results of the current keyword search)
//! - the selected slot (the item open in an editor)
//!
//! ## Consistency Rules
//!
//! 1. **Exclusive partitions**: an id lives in at most one of the three
//!    partitions of its kind. Every write that places an item in a partition
//!    evicts it from the other two.
//! 2. **Server truth only**: the store never flips flags locally. It applies
//!    the item the service returned and derives membership from its flags.
//! 3. **No synthesized positions**: when an item moves into a partition that
//!    does not hold it, fetched or not, the store reports that view back to
//!    the caller, who refetches it. Where the item lands is decided by the next
//!    paginated fetch.
//! 4. **Infallible mutators**: nothing in here returns an error. Failures are
//!    handled by the command layer, which simply does not call the store.
//!
//! ## Layout
//!
//! - [`collection::PartitionedCollection`]: the generic per-kind collection,
//!   instantiated for `Note` and `Todo`.
//! - [`tasks`]: task mutations on the todo collection.
//! - [`ClientStore`]: both collections plus the active search and dashboard
//!   context.
//! - [`StoreHandle`]: the shared handle every consumer receives.
//!
//! Reads are unrestricted. Writes go through the store's operations only; the
//! views themselves are never handed out mutably.

use crate::model::{Item, ItemId, ItemKind, Note, Partition, Todo};
use crate::pagination::{Pagination, PaginationPatch, DEFAULT_PAGE_SIZE, SEARCH_PAGE_SIZE};
use crate::remote::SearchQuery;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

pub mod collection;
pub mod tasks;

pub use collection::PartitionedCollection;

/// One of the cached lists of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Partition(Partition),
    Pinned,
    /// The dashboard page. Shares one pagination across both kinds.
    Home,
    Search,
}

impl View {
    pub const ACTIVE: View = View::Partition(Partition::Active);
    pub const ARCHIVED: View = View::Partition(Partition::Archived);
    pub const TRASHED: View = View::Partition(Partition::Trashed);

    pub fn partition(self) -> Option<Partition> {
        match self {
            View::Partition(p) => Some(p),
            View::Pinned | View::Home | View::Search => None,
        }
    }
}

impl From<Partition> for View {
    fn from(p: Partition) -> Self {
        View::Partition(p)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Partition(p) => write!(f, "{p}"),
            View::Pinned => f.write_str("pinned"),
            View::Home => f.write_str("home"),
            View::Search => f.write_str("search"),
        }
    }
}

/// A cached page of items together with its pagination descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    /// Whether this view has been fetched at least once since the last reset.
    pub loaded: bool,
}

impl<T> Paged<T> {
    pub fn new(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::with_page_size(page_size),
            loaded: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSettings {
    pub page_size: u32,
    pub search_page_size: u32,
    /// Ignore updates whose `updatedAt` is older than the cached copy.
    pub reject_stale_updates: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_page_size: SEARCH_PAGE_SIZE,
            reject_stale_updates: false,
        }
    }
}

/// Items of one dashboard page, as handed to [`ClientStore::set_home`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HomePage {
    pub notes: Vec<Note>,
    pub todos: Vec<Todo>,
    pub pinned_notes: Vec<Note>,
    pub pinned_todos: Vec<Todo>,
}

/// Both item collections and the current search context.
#[derive(Debug, Clone)]
pub struct ClientStore {
    pub(crate) notes: PartitionedCollection<Note>,
    pub(crate) todos: PartitionedCollection<Todo>,
    search: Option<SearchQuery>,
    /// Kind filter of the loaded dashboard; `None` inside means both kinds.
    home: Option<Option<ItemKind>>,
    settings: StoreSettings,
}

impl Default for ClientStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

impl ClientStore {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            notes: PartitionedCollection::new(settings),
            todos: PartitionedCollection::new(settings),
            search: None,
            home: None,
            settings,
        }
    }

    pub fn settings(&self) -> StoreSettings {
        self.settings
    }

    /// Drops everything cached. Used on logout.
    pub fn reset(&mut self) {
        tracing::debug!("resetting client store");
        *self = Self::new(self.settings);
    }

    pub fn notes(&self) -> &PartitionedCollection<Note> {
        &self.notes
    }

    pub fn todos(&self) -> &PartitionedCollection<Todo> {
        &self.todos
    }

    pub fn todos_mut(&mut self) -> &mut PartitionedCollection<Todo> {
        &mut self.todos
    }

    pub fn collection<T: Item>(&self) -> &PartitionedCollection<T> {
        T::collection(self)
    }

    pub fn collection_mut<T: Item>(&mut self) -> &mut PartitionedCollection<T> {
        T::collection_mut(self)
    }

    pub fn replace_partition<T: Item>(&mut self, partition: Partition, items: Vec<T>) {
        self.collection_mut::<T>().replace_partition(partition, items);
    }

    pub fn upsert_into_partition<T: Item>(&mut self, partition: Partition, item: T) {
        self.collection_mut::<T>().upsert_into_partition(partition, item);
    }

    pub fn apply_transition<T: Item>(&mut self, item: T) -> Vec<View> {
        self.collection_mut::<T>().apply_transition(item)
    }

    pub fn remove_everywhere<T: Item>(&mut self, id: &ItemId) -> bool {
        self.collection_mut::<T>().remove_everywhere(id)
    }

    pub fn set_selected<T: Item>(&mut self, item: Option<T>) {
        self.collection_mut::<T>().set_selected(item);
    }

    pub fn set_pagination<T: Item>(&mut self, view: View, patch: &PaginationPatch) {
        self.collection_mut::<T>().set_pagination(view, patch);
    }

    pub fn search_query(&self) -> Option<&SearchQuery> {
        self.search.as_ref()
    }

    /// Installs a fresh set of search results for both kinds.
    pub fn set_search_results(
        &mut self,
        query: SearchQuery,
        notes: Vec<Note>,
        todos: Vec<Todo>,
        patch: &PaginationPatch,
    ) {
        let scope = query.category;
        self.notes.replace_search(notes, scope);
        self.todos.replace_search(todos, scope);
        self.notes.set_pagination(View::Search, patch);
        self.todos.set_pagination(View::Search, patch);
        self.search = Some(query);
    }

    /// Kind filter of the loaded dashboard, if one was loaded.
    pub fn home_filter(&self) -> Option<Option<ItemKind>> {
        self.home
    }

    /// Installs a dashboard page. The pinned lists that come with it replace
    /// the pinned views of both kinds.
    pub fn set_home(&mut self, kind: Option<ItemKind>, page: HomePage, patch: &PaginationPatch) {
        self.notes.replace_home(page.notes, page.pinned_notes);
        self.todos.replace_home(page.todos, page.pinned_todos);
        self.notes.set_pagination(View::Home, patch);
        self.todos.set_pagination(View::Home, patch);
        self.home = Some(kind);
    }

    pub fn clear_search(&mut self) {
        self.notes.clear_search();
        self.todos.clear_search();
        self.search = None;
    }
}

/// Shared, process-wide handle to the [`ClientStore`].
///
/// Cloning the handle shares the store. Access is scoped to closures so that
/// no lock guard can be held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct StoreHandle(Arc<RwLock<ClientStore>>);

impl StoreHandle {
    pub fn new(store: ClientStore) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    pub fn read<R>(&self, f: impl FnOnce(&ClientStore) -> R) -> R {
        let guard = self.0.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut ClientStore) -> R) -> R {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Snapshot of the visible items of a view, sorted for display.
    pub fn visible<T: Item>(&self, view: View) -> Vec<T> {
        self.read(|s| s.collection::<T>().visible(view))
    }

    pub fn pagination<T: Item>(&self, view: View) -> Pagination {
        self.read(|s| s.collection::<T>().pagination(view))
    }

    pub fn selected<T: Item>(&self) -> Option<T> {
        self.read(|s| s.collection::<T>().selected().cloned())
    }

    pub fn find<T: Item>(&self, id: &ItemId) -> Option<T> {
        self.read(|s| s.collection::<T>().find(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;

    #[test]
    fn reset_keeps_settings_and_drops_items() {
        let settings = StoreSettings {
            page_size: 5,
            ..Default::default()
        };
        let mut store = ClientStore::new(settings);
        store.replace_partition(Partition::Active, vec![Note::new("1", "a", "")]);
        store.set_search_results(
            SearchQuery::new("a"),
            vec![Note::new("1", "a", "")],
            vec![],
            &PaginationPatch::pages(1, 1),
        );

        store.reset();

        assert!(store.notes().items(View::ACTIVE).is_empty());
        assert!(store.search_query().is_none());
        assert_eq!(store.notes().pagination(View::ACTIVE).limit, 5);
    }

    #[test]
    fn search_results_share_pagination_across_kinds() {
        let mut store = ClientStore::default();
        let mut query = SearchQuery::new("milk");
        query.kind = Some(ItemKind::Todo);
        store.set_search_results(
            query,
            vec![],
            vec![Todo::new("t", "Milk run")],
            &PaginationPatch::pages(2, 4),
        );

        assert_eq!(store.notes().pagination(View::Search).page, 2);
        assert_eq!(store.todos().pagination(View::Search).total_pages, 4);
        assert_eq!(store.notes().pagination(View::Search).limit, SEARCH_PAGE_SIZE);
        assert_eq!(store.todos().items(View::Search).len(), 1);
    }

    #[test]
    fn home_page_fills_both_kinds_and_their_pinned_views() {
        let mut store = ClientStore::default();
        let mut pinned = Todo::new("t2", "Pinned");
        pinned.meta.is_pinned = true;
        let page = HomePage {
            notes: vec![Note::new("1", "a", "")],
            todos: vec![Todo::new("t1", "b"), pinned.clone()],
            pinned_notes: vec![],
            pinned_todos: vec![pinned],
        };

        store.set_home(None, page, &PaginationPatch::pages(1, 3));

        assert_eq!(store.todos().items(View::Home).len(), 2);
        assert_eq!(store.todos().items(View::Pinned).len(), 1);
        assert!(store.notes().is_loaded(View::Pinned));
        assert_eq!(store.notes().pagination(View::Home).total_pages, 3);
        assert_eq!(store.home_filter(), Some(None));
        assert!(store.notes().partitions_of(&ItemId::new("1")).is_empty());
    }

    #[test]
    fn handle_clones_share_state() {
        let handle = StoreHandle::default();
        let other = handle.clone();
        handle.write(|s| s.upsert_into_partition(Partition::Active, Note::new("1", "a", "")));
        assert_eq!(other.visible::<Note>(View::ACTIVE).len(), 1);
    }
}
