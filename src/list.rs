use std::collections::HashMap;

use crate::task::{Status, Task, TaskId, TaskStats};

/// In-memory task list, newest first.
///
/// Every transition consumes the prior list and returns the next one. Order
/// comes from the store (creation time descending) and is never recomputed
/// here: new rows go to the head, patches keep their position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.tasks)
    }

    /// Ids of every task not yet done, in list order.
    pub fn open_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.status != Status::Done)
            .map(|t| t.id.clone())
            .collect()
    }

    /// Replace the whole list with a fresh query result.
    #[must_use]
    pub fn replace(self, tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    /// Prepend a newly created task. An existing row with the same id is
    /// dropped so the id appears exactly once.
    #[must_use]
    pub fn insert(self, task: Task) -> Self {
        let mut tasks = Vec::with_capacity(self.tasks.len() + 1);
        tasks.push(task);
        let id = tasks[0].id.clone();
        tasks.extend(self.tasks.into_iter().filter(|t| t.id != id));
        Self { tasks }
    }

    #[must_use]
    pub fn remove(self, id: &str) -> Self {
        Self {
            tasks: self.tasks.into_iter().filter(|t| t.id != id).collect(),
        }
    }

    #[must_use]
    pub fn update_status(self, id: &str, status: Status) -> Self {
        self.map_matching(|t| t.id == id, status)
    }

    #[must_use]
    pub fn update_status_bulk(self, ids: &[TaskId], status: Status) -> Self {
        self.map_matching(|t| ids.contains(&t.id), status)
    }

    fn map_matching(self, matches: impl Fn(&Task) -> bool, status: Status) -> Self {
        Self {
            tasks: self
                .tasks
                .into_iter()
                .map(|mut t| {
                    if matches(&t) {
                        t.status = status;
                    }
                    t
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFlags {
    pub deleting: bool,
    pub updating: bool,
}

impl RowFlags {
    pub fn busy(&self) -> bool {
        self.deleting || self.updating
    }
}

/// Which in-flight operation a flag tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagKind {
    Deleting(TaskId),
    Updating(TaskId),
    MarkingAllDone,
    Creating,
}

/// Per-row and global loading flags, keyed by id so they survive a refetch
/// that replaces every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientFlags {
    rows: HashMap<TaskId, RowFlags>,
    marking_all_done: bool,
    creating: bool,
}

impl TransientFlags {
    pub fn row(&self, id: &str) -> RowFlags {
        self.rows.get(id).copied().unwrap_or_default()
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.row(id).deleting
    }

    pub fn is_updating(&self, id: &str) -> bool {
        self.row(id).updating
    }

    pub fn marking_all_done(&self) -> bool {
        self.marking_all_done
    }

    pub fn creating(&self) -> bool {
        self.creating
    }

    pub fn is_set(&self, kind: &FlagKind) -> bool {
        match kind {
            FlagKind::Deleting(id) => self.is_deleting(id),
            FlagKind::Updating(id) => self.is_updating(id),
            FlagKind::MarkingAllDone => self.marking_all_done,
            FlagKind::Creating => self.creating,
        }
    }

    pub fn set(&mut self, kind: &FlagKind, value: bool) {
        match kind {
            FlagKind::Deleting(id) => self.set_row(id, |row| row.deleting = value),
            FlagKind::Updating(id) => self.set_row(id, |row| row.updating = value),
            FlagKind::MarkingAllDone => self.marking_all_done = value,
            FlagKind::Creating => self.creating = value,
        }
    }

    /// True when no operation of any kind is in flight.
    pub fn is_idle(&self) -> bool {
        self.rows.is_empty() && !self.marking_all_done && !self.creating
    }

    fn set_row(&mut self, id: &str, apply: impl FnOnce(&mut RowFlags)) {
        let mut row = self.row(id);
        apply(&mut row);
        if row == RowFlags::default() {
            self.rows.remove(id);
        } else {
            self.rows.insert(id.to_string(), row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::make_task;

    fn sample() -> TaskList {
        TaskList::new(vec![
            make_task("3", Status::Todo),
            make_task("2", Status::InProgress),
            make_task("1", Status::Done),
        ])
    }

    fn ids(list: &TaskList) -> Vec<&str> {
        list.tasks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_insert_prepends() {
        let list = sample().insert(make_task("4", Status::Todo));
        assert_eq!(ids(&list), vec!["4", "3", "2", "1"]);
    }

    #[test]
    fn test_insert_existing_id_moves_to_head_without_duplicate() {
        let mut created = make_task("2", Status::Done);
        created.title = "fresh".into();
        let list = sample().insert(created);
        assert_eq!(ids(&list), vec!["2", "3", "1"]);
        assert_eq!(list.tasks()[0].title, "fresh");
    }

    #[test]
    fn test_remove() {
        let list = sample().remove("2");
        assert_eq!(ids(&list), vec!["3", "1"]);
        // Unknown id is a no-op.
        assert_eq!(list.clone().remove("99"), list);
    }

    #[test]
    fn test_update_status_in_place() {
        let before = sample();
        let after = before.clone().update_status("3", Status::Done);
        assert_eq!(ids(&after), ids(&before));
        for (old, new) in before.tasks().iter().zip(after.tasks()) {
            if new.id == "3" {
                assert_eq!(new.status, Status::Done);
                assert_eq!(new.title, old.title);
            } else {
                assert_eq!(new, old);
            }
        }
    }

    #[test]
    fn test_update_status_bulk() {
        let list = sample().update_status_bulk(&["3".to_string(), "2".to_string()], Status::Done);
        assert!(list.tasks().iter().all(|t| t.status == Status::Done));
        assert_eq!(ids(&list), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_open_ids_and_replace() {
        let list = sample();
        assert_eq!(list.open_ids(), vec!["3".to_string(), "2".to_string()]);
        let list = list.replace(vec![make_task("9", Status::Done)]);
        assert_eq!(ids(&list), vec!["9"]);
        assert!(list.open_ids().is_empty());
    }

    #[test]
    fn test_flags_keyed_by_id() {
        let mut flags = TransientFlags::default();
        flags.set(&FlagKind::Deleting("1".into()), true);
        flags.set(&FlagKind::Updating("2".into()), true);
        assert!(flags.is_deleting("1"));
        assert!(!flags.is_updating("1"));
        assert!(flags.row("2").busy());
        assert!(!flags.is_idle());

        flags.set(&FlagKind::Deleting("1".into()), false);
        flags.set(&FlagKind::Updating("2".into()), false);
        assert!(flags.is_idle());
    }

    #[test]
    fn test_global_flags() {
        let mut flags = TransientFlags::default();
        flags.set(&FlagKind::MarkingAllDone, true);
        flags.set(&FlagKind::Creating, true);
        assert!(flags.marking_all_done());
        assert!(flags.is_set(&FlagKind::Creating));
        flags.set(&FlagKind::MarkingAllDone, false);
        flags.set(&FlagKind::Creating, false);
        assert!(flags.is_idle());
    }
}
