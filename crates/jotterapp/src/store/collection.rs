//! # Partitioned Collection
//!
//! One collection per item kind. It owns the three lifecycle partitions, the
//! derived views (pinned, home, search) and the selected slot, and it is the
//! only place that mutates them.
//!
//! Placement is always derived from the item's own flags via
//! [`Item::partition`]; callers pass the partition explicitly only for fresh
//! list fetches and creations, where the service has already told us which
//! list the items belong to.

use super::{Paged, StoreSettings, View};
use crate::lifecycle::Lifecycle;
use crate::model::{Item, ItemId, Partition};
use crate::ordering::sort_for_display;
use crate::pagination::{Pagination, PaginationPatch};

#[derive(Debug, Clone)]
pub struct PartitionedCollection<T> {
    active: Paged<T>,
    archived: Paged<T>,
    trashed: Paged<T>,
    pinned: Paged<T>,
    home: Paged<T>,
    search: Paged<T>,
    selected: Option<T>,
    /// Partition the current search is restricted to, if any.
    search_scope: Option<Partition>,
    reject_stale: bool,
}

impl<T: Item> PartitionedCollection<T> {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            active: Paged::new(settings.page_size),
            archived: Paged::new(settings.page_size),
            trashed: Paged::new(settings.page_size),
            pinned: Paged::new(settings.page_size),
            home: Paged::new(settings.page_size),
            search: Paged::new(settings.search_page_size),
            selected: None,
            search_scope: None,
            reject_stale: settings.reject_stale_updates,
        }
    }

    fn view(&self, view: View) -> &Paged<T> {
        match view {
            View::Partition(Partition::Active) => &self.active,
            View::Partition(Partition::Archived) => &self.archived,
            View::Partition(Partition::Trashed) => &self.trashed,
            View::Pinned => &self.pinned,
            View::Home => &self.home,
            View::Search => &self.search,
        }
    }

    fn view_mut(&mut self, view: View) -> &mut Paged<T> {
        match view {
            View::Partition(Partition::Active) => &mut self.active,
            View::Partition(Partition::Archived) => &mut self.archived,
            View::Partition(Partition::Trashed) => &mut self.trashed,
            View::Pinned => &mut self.pinned,
            View::Home => &mut self.home,
            View::Search => &mut self.search,
        }
    }

    fn all_views() -> [View; 6] {
        [
            View::ACTIVE,
            View::ARCHIVED,
            View::TRASHED,
            View::Pinned,
            View::Home,
            View::Search,
        ]
    }

    // --- reads ---

    pub fn items(&self, view: View) -> &[T] {
        &self.view(view).items
    }

    /// Items of a view in display order.
    pub fn visible(&self, view: View) -> Vec<T> {
        let mut items = self.view(view).items.clone();
        sort_for_display(&mut items);
        items
    }

    pub fn pagination(&self, view: View) -> Pagination {
        self.view(view).pagination
    }

    pub fn is_loaded(&self, view: View) -> bool {
        self.view(view).loaded
    }

    pub fn contains(&self, view: View, id: &ItemId) -> bool {
        self.view(view).items.iter().any(|i| i.id() == id)
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    /// Any cached copy of the item. The selected slot wins, then partitions,
    /// then derived views.
    pub fn find(&self, id: &ItemId) -> Option<&T> {
        self.selected
            .as_ref()
            .filter(|i| i.id() == id)
            .or_else(|| {
                Self::all_views()
                    .into_iter()
                    .find_map(|v| self.view(v).items.iter().find(|i| i.id() == id))
            })
    }

    /// Lifecycle of the cached copy, if the item is cached at all.
    pub fn cached_lifecycle(&self, id: &ItemId) -> Option<Lifecycle> {
        self.find(id).map(|i| Lifecycle::from(i.partition()))
    }

    /// Partitions currently holding the id. More than one means a bug.
    pub fn partitions_of(&self, id: &ItemId) -> Vec<Partition> {
        Partition::ALL
            .into_iter()
            .filter(|p| self.contains(View::Partition(*p), id))
            .collect()
    }

    // --- writes ---

    /// Replaces a partition wholesale after a fresh fetch.
    pub fn replace_partition(&mut self, partition: Partition, items: Vec<T>) {
        tracing::debug!(kind = %T::KIND, %partition, count = items.len(), "replace partition");
        for item in &items {
            self.evict_from_other_partitions(partition, item.id());
        }
        let paged = self.view_mut(View::Partition(partition));
        paged.items = items;
        paged.loaded = true;
    }

    /// Replaces the pinned view after a fresh fetch. The pinned list is never
    /// paginated, so its descriptor is one page holding everything.
    pub fn replace_pinned(&mut self, items: Vec<T>) {
        tracing::debug!(kind = %T::KIND, count = items.len(), "replace pinned");
        let whole = PaginationPatch {
            page: Some(1),
            total_items: Some(items.len() as u64),
            total_pages: Some(1),
            ..Default::default()
        };
        self.pinned.items = items;
        self.pinned.loaded = true;
        self.pinned.pagination.merge(&whole);
    }

    /// Replaces the dashboard page and, with it, the pinned view.
    pub(crate) fn replace_home(&mut self, items: Vec<T>, pinned: Vec<T>) {
        tracing::debug!(kind = %T::KIND, count = items.len(), "replace home");
        self.home.items = items;
        self.home.loaded = true;
        self.replace_pinned(pinned);
    }

    pub(crate) fn replace_search(&mut self, items: Vec<T>, scope: Option<Partition>) {
        self.search.items = items;
        self.search.loaded = true;
        self.search_scope = scope;
    }

    pub(crate) fn clear_search(&mut self) {
        self.search.items.clear();
        self.search.loaded = false;
        self.search_scope = None;
    }

    /// Inserts at the head if absent, otherwise replaces in place. Evicts the
    /// id from the other partitions and refreshes the derived views that
    /// already show it.
    pub fn upsert_into_partition(&mut self, partition: Partition, item: T) {
        let id = item.id().clone();
        self.evict_from_other_partitions(partition, &id);

        let paged = self.view_mut(View::Partition(partition));
        match paged.items.iter_mut().find(|i| i.id() == &id) {
            Some(slot) => *slot = item.clone(),
            None => paged.items.insert(0, item.clone()),
        }

        for view in [View::Pinned, View::Home, View::Search] {
            self.replace_in(view, &item);
        }
        if self.selected.as_ref().is_some_and(|s| s.id() == &id) {
            self.selected = Some(item);
        }
    }

    /// Applies a server-confirmed item after a lifecycle move or an edit.
    ///
    /// Returns the views the item now belongs to but is not cached in: its
    /// home partition whether or not that was fetched before, and the pinned
    /// view once loaded. The caller is expected to refetch them.
    pub fn apply_transition(&mut self, item: T) -> Vec<View> {
        let id = item.id().clone();

        if self.is_stale(&item) {
            tracing::warn!(kind = %T::KIND, %id, "ignoring update older than the cached copy");
            return Vec::new();
        }

        let destination = item.partition();
        let pinned = item.meta().is_pinned;
        tracing::debug!(kind = %T::KIND, %id, %destination, pinned, "apply transition");

        for partition in Partition::ALL {
            if partition == destination {
                self.replace_in(View::Partition(partition), &item);
            } else {
                self.remove_from(View::Partition(partition), &id);
            }
        }

        if pinned {
            self.replace_in(View::Pinned, &item);
        } else {
            self.remove_from(View::Pinned, &id);
        }

        if destination == Partition::Active {
            self.replace_in(View::Home, &item);
        } else {
            self.remove_from(View::Home, &id);
        }

        let keep_in_search = match self.search_scope {
            Some(scope) => scope == destination,
            None => destination != Partition::Trashed,
        };
        if keep_in_search {
            self.replace_in(View::Search, &item);
        } else {
            self.remove_from(View::Search, &id);
        }

        if self.selected.as_ref().is_some_and(|s| s.id() == &id) {
            self.selected = Some(item);
        }

        let mut refetch = Vec::new();
        let home = View::Partition(destination);
        if !self.contains(home, &id) {
            refetch.push(home);
        }
        if pinned && self.pinned.loaded && !self.contains(View::Pinned, &id) {
            refetch.push(View::Pinned);
        }
        refetch
    }

    /// Permanent delete: the id disappears from every view and the selected slot.
    pub fn remove_everywhere(&mut self, id: &ItemId) -> bool {
        let mut removed = false;
        for view in Self::all_views() {
            removed |= self.remove_from(view, id);
        }
        if self.selected.as_ref().is_some_and(|s| s.id() == id) {
            self.selected = None;
            removed = true;
        }
        tracing::debug!(kind = %T::KIND, %id, removed, "remove everywhere");
        removed
    }

    pub fn set_selected(&mut self, item: Option<T>) {
        self.selected = item;
    }

    /// Clears the selected slot only if it still holds `id`.
    pub fn clear_selected_if(&mut self, id: Option<&ItemId>) {
        let matches = match (self.selected.as_ref(), id) {
            (Some(current), Some(id)) => current.id() == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if matches {
            self.selected = None;
        }
    }

    pub fn set_pagination(&mut self, view: View, patch: &PaginationPatch) {
        self.view_mut(view).pagination.merge(patch);
    }

    /// Applies `f` to every cached copy of `id`, including the selected slot.
    /// Returns how many copies were touched.
    pub(crate) fn for_each_copy(&mut self, id: &ItemId, mut f: impl FnMut(&mut T)) -> usize {
        let mut touched = 0;
        for view in Self::all_views() {
            for item in self.view_mut(view).items.iter_mut().filter(|i| i.id() == id) {
                f(item);
                touched += 1;
            }
        }
        if let Some(selected) = self.selected.as_mut().filter(|s| s.id() == id) {
            f(selected);
            touched += 1;
        }
        touched
    }

    fn is_stale(&self, incoming: &T) -> bool {
        if !self.reject_stale {
            return false;
        }
        let Some(cached) = self.find(incoming.id()) else {
            return false;
        };
        match (cached.meta().updated_at, incoming.meta().updated_at) {
            (Some(have), Some(got)) => got < have,
            _ => false,
        }
    }

    fn evict_from_other_partitions(&mut self, keep: Partition, id: &ItemId) {
        for partition in Partition::ALL.into_iter().filter(|p| *p != keep) {
            self.remove_from(View::Partition(partition), id);
        }
    }

    fn replace_in(&mut self, view: View, item: &T) -> bool {
        match self.view_mut(view).items.iter_mut().find(|i| i.id() == item.id()) {
            Some(slot) => {
                *slot = item.clone();
                true
            }
            None => false,
        }
    }

    fn remove_from(&mut self, view: View, id: &ItemId) -> bool {
        let items = &mut self.view_mut(view).items;
        let before = items.len();
        items.retain(|i| i.id() != id);
        items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::parse_timestamp;
    use crate::model::Note;

    fn collection() -> PartitionedCollection<Note> {
        PartitionedCollection::new(StoreSettings::default())
    }

    fn note(id: &str) -> Note {
        Note::new(id, format!("note {id}"), "")
    }

    fn flagged(id: &str, archived: bool, trash: bool, pinned: bool) -> Note {
        let mut n = note(id);
        n.meta.is_archived = archived;
        n.meta.is_trash = trash;
        n.meta.is_pinned = pinned;
        n
    }

    fn id(s: &str) -> ItemId {
        ItemId::new(s)
    }

    #[test]
    fn replace_partition_marks_loaded_and_evicts_elsewhere() {
        let mut c = collection();
        c.replace_partition(Partition::Active, vec![note("1"), note("2")]);
        c.replace_partition(Partition::Archived, vec![flagged("2", true, false, false)]);

        assert!(c.is_loaded(View::ARCHIVED));
        assert_eq!(c.partitions_of(&id("2")), vec![Partition::Archived]);
        assert_eq!(c.items(View::ACTIVE).len(), 1);
    }

    #[test]
    fn upsert_inserts_at_head_and_replaces_in_place() {
        let mut c = collection();
        c.replace_partition(Partition::Active, vec![note("1"), note("2")]);

        c.upsert_into_partition(Partition::Active, note("3"));
        assert_eq!(c.items(View::ACTIVE)[0].meta.id, id("3"));

        let mut renamed = note("2");
        renamed.meta.title = "renamed".into();
        c.upsert_into_partition(Partition::Active, renamed);
        assert_eq!(c.items(View::ACTIVE).len(), 3);
        assert_eq!(c.items(View::ACTIVE)[2].meta.title, "renamed");
    }

    #[test]
    fn upsert_refreshes_selected_copy() {
        let mut c = collection();
        c.set_selected(Some(note("1")));
        let mut edited = note("1");
        edited.content = "<p>new</p>".into();
        c.upsert_into_partition(Partition::Active, edited);
        assert_eq!(c.selected().unwrap().content, "<p>new</p>");
    }

    #[test]
    fn transition_moves_between_partitions_atomically() {
        let mut c = collection();
        c.replace_partition(Partition::Active, vec![note("1")]);
        c.replace_partition(Partition::Trashed, vec![]);

        let refetch = c.apply_transition(flagged("1", false, true, false));

        assert!(!c.contains(View::ACTIVE, &id("1")));
        assert_eq!(refetch, vec![View::TRASHED]);
    }

    #[test]
    fn transition_into_unfetched_partition_asks_for_it() {
        let mut c = collection();
        c.replace_partition(Partition::Active, vec![note("1")]);
        let refetch = c.apply_transition(flagged("1", true, false, false));
        assert_eq!(refetch, vec![View::ARCHIVED]);
        assert!(c.partitions_of(&id("1")).is_empty());
    }

    #[test]
    fn pinned_view_is_not_refetched_until_loaded() {
        let mut c = collection();
        c.upsert_into_partition(Partition::Active, note("1"));
        let refetch = c.apply_transition(flagged("1", false, false, true));
        assert!(refetch.is_empty());
    }

    #[test]
    fn transition_updates_stale_copy_in_right_partition() {
        let mut c = collection();
        c.replace_partition(Partition::Archived, vec![flagged("1", true, false, false)]);
        let mut updated = flagged("1", true, false, false);
        updated.meta.title = "fresh".into();

        let refetch = c.apply_transition(updated);

        assert!(refetch.is_empty());
        assert_eq!(c.items(View::ARCHIVED)[0].meta.title, "fresh");
    }

    #[test]
    fn unpinned_items_leave_the_pinned_view() {
        let mut c = collection();
        c.replace_pinned(vec![flagged("1", false, false, true)]);
        c.apply_transition(flagged("1", false, false, false));
        assert!(c.items(View::Pinned).is_empty());

        let refetch = c.apply_transition(flagged("1", false, false, true));
        assert_eq!(refetch, vec![View::Pinned]);
    }

    #[test]
    fn home_view_keeps_only_active_items() {
        let mut c = collection();
        c.replace_home(vec![note("1"), note("2")], vec![]);

        let mut renamed = note("2");
        renamed.meta.title = "renamed".into();
        c.apply_transition(renamed);
        c.apply_transition(flagged("1", true, false, false));

        assert!(!c.contains(View::Home, &id("1")));
        assert_eq!(c.items(View::Home)[0].meta.title, "renamed");
        assert!(c.is_loaded(View::Pinned));
    }

    #[test]
    fn trashed_items_leave_unscoped_search() {
        let mut c = collection();
        c.replace_search(vec![note("1"), note("2")], None);
        c.apply_transition(flagged("1", false, true, false));
        assert!(!c.contains(View::Search, &id("1")));
        assert!(c.contains(View::Search, &id("2")));
    }

    #[test]
    fn trash_scoped_search_keeps_trashed_items() {
        let mut c = collection();
        c.replace_search(vec![flagged("1", false, true, false)], Some(Partition::Trashed));
        c.apply_transition(flagged("1", false, true, true));
        assert!(c.contains(View::Search, &id("1")));

        c.apply_transition(note("1"));
        assert!(!c.contains(View::Search, &id("1")));
    }

    #[test]
    fn remove_everywhere_clears_all_views_and_selection() {
        let mut c = collection();
        let item = flagged("1", false, true, true);
        c.replace_partition(Partition::Trashed, vec![item.clone()]);
        c.replace_pinned(vec![item.clone()]);
        c.replace_search(vec![item.clone()], Some(Partition::Trashed));
        c.set_selected(Some(item));

        assert!(c.remove_everywhere(&id("1")));

        for view in PartitionedCollection::<Note>::all_views() {
            assert!(!c.contains(view, &id("1")), "{view} still holds the item");
        }
        assert!(c.selected().is_none());
    }

    #[test]
    fn remove_everywhere_leaves_unrelated_selection() {
        let mut c = collection();
        c.set_selected(Some(note("2")));
        assert!(!c.remove_everywhere(&id("1")));
        assert!(c.selected().is_some());
    }

    #[test]
    fn stale_guard_rejects_older_updates_when_enabled() {
        let mut c = PartitionedCollection::<Note>::new(StoreSettings {
            reject_stale_updates: true,
            ..Default::default()
        });
        let mut newer = note("1");
        newer.meta.updated_at = parse_timestamp("2024-01-02");
        c.replace_partition(Partition::Active, vec![newer]);

        let mut older = flagged("1", false, true, false);
        older.meta.updated_at = parse_timestamp("2024-01-01");
        c.apply_transition(older);

        assert!(c.contains(View::ACTIVE, &id("1")));
    }

    #[test]
    fn last_write_wins_by_default() {
        let mut c = collection();
        let mut newer = note("1");
        newer.meta.updated_at = parse_timestamp("2024-01-02");
        c.replace_partition(Partition::Active, vec![newer]);

        let mut older = note("1");
        older.meta.title = "older".into();
        older.meta.updated_at = parse_timestamp("2024-01-01");
        c.apply_transition(older);

        assert_eq!(c.items(View::ACTIVE)[0].meta.title, "older");
    }

    #[test]
    fn partitions_stay_exclusive_through_a_sequence_of_moves() {
        let mut c = collection();
        for p in Partition::ALL {
            c.replace_partition(p, vec![]);
        }
        c.upsert_into_partition(Partition::Active, note("1"));

        let moves = [
            flagged("1", true, false, false),
            flagged("1", false, true, false),
            note("1"),
            flagged("1", false, true, true),
            flagged("1", true, false, false),
        ];
        for item in moves {
            let expected = item.partition();
            for view in c.apply_transition(item.clone()) {
                if let Some(p) = view.partition() {
                    c.upsert_into_partition(p, item.clone());
                }
            }
            assert_eq!(c.partitions_of(&id("1")), vec![expected]);
        }
    }

    #[test]
    fn visible_sorts_pinned_first() {
        let mut c = collection();
        let mut old_pinned = flagged("p", false, false, true);
        old_pinned.meta.updated_at = parse_timestamp("2023-01-01");
        let mut fresh = note("n");
        fresh.meta.updated_at = parse_timestamp("2024-01-01");
        c.replace_partition(Partition::Active, vec![fresh, old_pinned]);

        let order: Vec<_> = c.visible(View::ACTIVE).into_iter().map(|n| n.meta.id).collect();
        assert_eq!(order, vec![id("p"), id("n")]);
    }
}
