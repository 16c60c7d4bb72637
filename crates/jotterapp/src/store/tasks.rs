//! Task sub-collection of the todo collection.
//!
//! A todo can be cached in several places at once (a partition, the pinned
//! view, search results, the editor). Every task mutation is applied to each
//! of those copies so they never disagree.
//!
//! A mutation that finds no cached copy of the parent todo is a no-op. That
//! only happens with a stale reference, so the methods return whether
//! anything was touched and leave logging to the caller.

use super::PartitionedCollection;
use crate::model::{ItemId, Task, Todo};

impl PartitionedCollection<Todo> {
    /// Adds a server-created task to every copy of its todo. Adding the same
    /// task id twice leaves a single entry.
    pub fn add_task(&mut self, todo_id: &ItemId, task: Task) -> bool {
        if task.id.is_empty() {
            tracing::warn!(%todo_id, "refusing to cache a task without an id");
            return false;
        }
        let touched = self.for_each_copy(todo_id, |todo| {
            if !todo.tasks.iter().any(|t| t.id == task.id) {
                todo.tasks.push(task.clone());
            }
        });
        touched > 0
    }

    /// Replaces the task with the same id, appending it when missing.
    pub fn update_task(&mut self, todo_id: &ItemId, task: Task) -> bool {
        let touched = self.for_each_copy(todo_id, |todo| {
            match todo.tasks.iter_mut().find(|t| t.id == task.id) {
                Some(slot) => *slot = task.clone(),
                None => todo.tasks.push(task.clone()),
            }
        });
        touched > 0
    }

    pub fn remove_task(&mut self, todo_id: &ItemId, task_id: &ItemId) -> bool {
        let touched = self.for_each_copy(todo_id, |todo| {
            todo.tasks.retain(|t| &t.id != task_id);
        });
        touched > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Partition;
    use crate::store::{StoreSettings, View};

    fn todos_with(todo: Todo) -> PartitionedCollection<Todo> {
        let mut c = PartitionedCollection::new(StoreSettings::default());
        c.replace_partition(Partition::Active, vec![todo.clone()]);
        c.replace_search(vec![todo.clone()], None);
        c.set_selected(Some(todo));
        c
    }

    fn tid(s: &str) -> ItemId {
        ItemId::new(s)
    }

    #[test]
    fn add_task_reaches_every_copy() {
        let mut c = todos_with(Todo::new("g", "Groceries"));
        assert!(c.add_task(&tid("g"), Task::new("t1", "Milk")));

        assert_eq!(c.items(View::ACTIVE)[0].tasks.len(), 1);
        assert_eq!(c.items(View::Search)[0].tasks.len(), 1);
        assert_eq!(c.selected().unwrap().tasks.len(), 1);
    }

    #[test]
    fn add_task_is_idempotent() {
        let mut c = todos_with(Todo::new("g", "Groceries"));
        c.add_task(&tid("g"), Task::new("t1", "Milk"));
        c.add_task(&tid("g"), Task::new("t1", "Milk"));

        let ids: Vec<_> = c.items(View::ACTIVE)[0].tasks.iter().map(|t| &t.id).collect();
        assert_eq!(ids, vec![&tid("t1")]);
    }

    #[test]
    fn add_task_without_id_is_refused() {
        let mut c = todos_with(Todo::new("g", "Groceries"));
        assert!(!c.add_task(&tid("g"), Task::new("", "Milk")));
        assert!(c.items(View::ACTIVE)[0].tasks.is_empty());
    }

    #[test]
    fn stale_todo_reference_is_a_noop() {
        let mut c = todos_with(Todo::new("g", "Groceries"));
        assert!(!c.add_task(&tid("missing"), Task::new("t1", "Milk")));
        assert!(!c.update_task(&tid("missing"), Task::new("t1", "Milk")));
        assert!(!c.remove_task(&tid("missing"), &tid("t1")));
    }

    #[test]
    fn update_task_replaces_or_appends() {
        let mut c = todos_with(Todo::new("g", "Groceries"));
        c.add_task(&tid("g"), Task::new("t1", "Milk"));

        c.update_task(&tid("g"), Task::new("t1", "Milk").completed(true));
        c.update_task(&tid("g"), Task::new("t2", "Eggs"));

        let todo = c.selected().unwrap();
        assert!(todo.task(&tid("t1")).unwrap().is_completed);
        assert_eq!(todo.tasks.len(), 2);
        assert_eq!(c.items(View::Search)[0].tasks.len(), 2);
    }

    #[test]
    fn remove_task_filters_every_copy() {
        let mut todo = Todo::new("g", "Groceries");
        todo.tasks = vec![Task::new("t1", "Milk"), Task::new("t2", "Eggs")];
        let mut c = todos_with(todo);

        assert!(c.remove_task(&tid("g"), &tid("t1")));

        assert_eq!(c.items(View::ACTIVE)[0].tasks.len(), 1);
        assert_eq!(c.selected().unwrap().tasks[0].id, tid("t2"));
        assert_eq!(c.items(View::Search)[0].tasks.len(), 1);
    }
}
