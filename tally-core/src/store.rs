//! TaskStore: the in-memory task list and its persistence contract.
//!
//! The store owns the list exclusively; callers read derived views and issue
//! mutations. Every mutation that changes the list is written through the
//! injected [`Storage`] adapter before the call returns. The in-memory state
//! stays authoritative: a failed save comes back as a warning value with the
//! mutation already applied, and the caller decides how loudly to report it.
//!
//! The asynchronous categorization continuation is modeled as an explicit
//! patch ([`CategoryOutcome`]) keyed by task id: apply if the task is still
//! there, discard if it was deleted mid-flight.

use anyhow::{Context, Result};

use crate::task::{Filter, Task, Theme};

/// Durable key-value persistence for the two independent records the app
/// keeps: the task list and the theme flag. Whole-record overwrites, no
/// versioning, no retries.
pub trait Storage {
    /// Absent record => empty list. Unreadable or corrupt => error; the
    /// store recovers to empty and reports upward.
    fn load_tasks(&self) -> Result<Vec<Task>>;

    fn save_tasks(&self, tasks: &[Task]) -> Result<()>;

    /// Unset or unrecognized stored value => `Theme::Light`.
    fn load_theme(&self) -> Theme;

    fn save_theme(&self, theme: Theme) -> Result<()>;
}

/// Result of a categorization round trip, delivered later than the `add`
/// that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    Resolved(String),
    Failed,
}

#[derive(Debug)]
pub struct TaskStore<S: Storage> {
    tasks: Vec<Task>,
    storage: S,
}

impl<S: Storage> TaskStore<S> {
    /// Load persisted tasks. A failed read starts the store empty and hands
    /// the error back for non-fatal reporting; startup itself never fails.
    ///
    /// Any `is_categorizing` flag left over from an interrupted session is
    /// cleared here; no request in this process will ever resolve it.
    pub fn load(storage: S) -> (Self, Option<anyhow::Error>) {
        let (mut tasks, warn) = match storage.load_tasks() {
            Ok(tasks) => (tasks, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        for t in tasks.iter_mut() {
            t.is_categorizing = false;
        }
        (Self { tasks, storage }, warn)
    }

    /// Add a new task at the front of the list. Blank input (after trim)
    /// creates nothing. Returns the new task's id (the caller keys the
    /// categorization round trip on it) alongside any save warning, since
    /// the task exists in memory even when the write failed.
    pub fn add(&mut self, text: &str) -> (Option<String>, Option<anyhow::Error>) {
        let text = text.trim();
        if text.is_empty() {
            return (None, None);
        }
        let task = Task::new(text);
        let id = task.id.clone();
        self.tasks.insert(0, task);
        let warn = self.persist().err();
        (Some(id), warn)
    }

    /// Flip `completed` on the matching task; no-op when the id is unknown.
    pub fn toggle(&mut self, id: &str) -> Result<()> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(());
        };
        task.completed = !task.completed;
        self.persist()
    }

    /// Replace the task's text. An edit that trims to empty is rejected and
    /// the prior text kept: an empty string is never stored.
    pub fn edit(&mut self, id: &str, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(());
        };
        task.text = text.to_string();
        self.persist()
    }

    /// Remove the matching task; no-op when the id is unknown.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        if self.tasks.len() == before {
            return Ok(());
        }
        self.persist()
    }

    /// Remove every completed task, keeping the rest in order.
    pub fn clear_completed(&mut self) -> Result<()> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        if self.tasks.len() == before {
            return Ok(());
        }
        self.persist()
    }

    /// Set the task's category to the trimmed value, or "General" when that
    /// is empty.
    pub fn set_category(&mut self, id: &str, category: &str) -> Result<()> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(());
        };
        task.category = Some(normalize_category(category));
        self.persist()
    }

    /// Apply the result of a categorization round trip to the task it was
    /// started for. The task may have been deleted meanwhile; the patch is
    /// then discarded without error. `is_categorizing` clears on success and
    /// failure alike, so no task is left pending forever. Category updates
    /// are last-writer-wins: a value the user set in the meantime is
    /// overwritten.
    pub fn apply_category(&mut self, id: &str, outcome: CategoryOutcome) -> Result<()> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(());
        };
        if let CategoryOutcome::Resolved(label) = outcome {
            task.category = Some(normalize_category(&label));
        }
        task.is_categorizing = false;
        self.persist()
    }

    /// Tasks matching the filter, in list order. Pure read.
    pub fn filtered(&self, filter: Filter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Case-insensitive duplicate probe, used before adding an accepted
    /// suggestion.
    pub fn contains_text(&self, text: &str) -> bool {
        let needle = text.trim().to_lowercase();
        self.tasks.iter().any(|t| t.text.to_lowercase() == needle)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&self) -> Result<()> {
        self.storage.save_tasks(&self.tasks).context("save tasks")
    }
}

fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "General".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// In-memory adapter: the persisted blob is a `RefCell`, and either side
    /// can be made to fail to exercise the recovery paths.
    #[derive(Debug, Default)]
    struct MemStorage {
        saved: RefCell<Vec<Task>>,
        fail_load: bool,
        fail_save: bool,
        theme: RefCell<Theme>,
    }

    impl MemStorage {
        fn with_tasks(tasks: Vec<Task>) -> Self {
            Self {
                saved: RefCell::new(tasks),
                ..Self::default()
            }
        }
    }

    impl Storage for MemStorage {
        fn load_tasks(&self) -> Result<Vec<Task>> {
            if self.fail_load {
                anyhow::bail!("stored data is corrupt");
            }
            Ok(self.saved.borrow().clone())
        }

        fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
            if self.fail_save {
                anyhow::bail!("disk full");
            }
            *self.saved.borrow_mut() = tasks.to_vec();
            Ok(())
        }

        fn load_theme(&self) -> Theme {
            *self.theme.borrow()
        }

        fn save_theme(&self, theme: Theme) -> Result<()> {
            *self.theme.borrow_mut() = theme;
            Ok(())
        }
    }

    fn empty_store() -> TaskStore<MemStorage> {
        let (store, warn) = TaskStore::load(MemStorage::default());
        assert!(warn.is_none());
        store
    }

    fn add_ok(store: &mut TaskStore<MemStorage>, text: &str) -> String {
        let (id, warn) = store.add(text);
        assert!(warn.is_none());
        id.expect("non-blank add")
    }

    #[test]
    fn add_prepends_and_persists() {
        let mut store = empty_store();
        let first = add_ok(&mut store, "Buy milk");
        let second = add_ok(&mut store, "Call mom");

        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
        // newest first
        assert_eq!(store.tasks()[0].id, second);
        assert_eq!(store.tasks()[1].id, first);
        assert_eq!(store.storage().saved.borrow().len(), 2);
    }

    #[test]
    fn blank_add_creates_nothing() {
        let mut store = empty_store();
        assert_eq!(store.add("").0, None);
        assert_eq!(store.add("   ").0, None);
        assert!(store.is_empty());
    }

    #[test]
    fn count_tracks_additions_minus_deletions() {
        let mut store = empty_store();
        let a = add_ok(&mut store, "a");
        let _b = add_ok(&mut store, "b");
        let c = add_ok(&mut store, "c");
        store.delete(&a).unwrap();
        store.delete(&c).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn toggle_flips_and_tolerates_unknown_id() {
        let mut store = empty_store();
        let id = add_ok(&mut store, "task");

        store.toggle(&id).unwrap();
        assert!(store.get(&id).unwrap().completed);
        store.toggle(&id).unwrap();
        assert!(!store.get(&id).unwrap().completed);

        store.toggle("nope").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_edit_keeps_prior_text() {
        let mut store = empty_store();
        let id = add_ok(&mut store, "original");

        store.edit(&id, "   ").unwrap();
        assert_eq!(store.get(&id).unwrap().text, "original");

        store.edit(&id, "  updated  ").unwrap();
        assert_eq!(store.get(&id).unwrap().text, "updated");
    }

    #[test]
    fn clear_completed_removes_exactly_the_completed_subset() {
        let mut store = empty_store();
        let a = add_ok(&mut store, "a");
        let b = add_ok(&mut store, "b");
        let c = add_ok(&mut store, "c");
        store.toggle(&a).unwrap();
        store.toggle(&c).unwrap();

        store.clear_completed().unwrap();

        // only b remains, order preserved
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn set_category_trims_and_defaults_to_general() {
        let mut store = empty_store();
        let id = add_ok(&mut store, "task");

        store.set_category(&id, "  Work  ").unwrap();
        assert_eq!(store.get(&id).unwrap().category.as_deref(), Some("Work"));

        store.set_category(&id, "   ").unwrap();
        assert_eq!(store.get(&id).unwrap().category.as_deref(), Some("General"));
    }

    #[test]
    fn filtered_views_partition_the_list() {
        let mut store = empty_store();
        let a = add_ok(&mut store, "a");
        let _b = add_ok(&mut store, "b");
        store.toggle(&a).unwrap();

        let active = store.filtered(Filter::Active);
        let completed = store.filtered(Filter::Completed);
        let all = store.filtered(Filter::All);

        assert_eq!(active.len() + completed.len(), all.len());
        assert!(active.iter().all(|t| !t.completed));
        assert!(completed.iter().all(|t| t.completed));
        assert_eq!(store.completed_count(), 1);
    }

    #[test]
    fn apply_category_resolved_sets_label_and_clears_flag() {
        let mut store = empty_store();
        let id = add_ok(&mut store, "Buy milk");
        assert!(store.get(&id).unwrap().is_categorizing);
        assert!(store.get(&id).unwrap().category.is_none());

        store
            .apply_category(&id, CategoryOutcome::Resolved("Shopping".to_string()))
            .unwrap();

        let task = store.get(&id).unwrap();
        assert_eq!(task.category.as_deref(), Some("Shopping"));
        assert!(!task.is_categorizing);
    }

    #[test]
    fn apply_category_failed_only_clears_flag() {
        let mut store = empty_store();
        let id = add_ok(&mut store, "task");

        store.apply_category(&id, CategoryOutcome::Failed).unwrap();

        let task = store.get(&id).unwrap();
        assert_eq!(task.category, None);
        assert!(!task.is_categorizing);
    }

    #[test]
    fn apply_category_after_delete_is_discarded() {
        let mut store = empty_store();
        let id = add_ok(&mut store, "Call mom");
        store.delete(&id).unwrap();

        store
            .apply_category(&id, CategoryOutcome::Resolved("Social".to_string()))
            .unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn apply_category_overwrites_a_user_set_label() {
        // last-writer-wins: no guard against the race with a manual edit
        let mut store = empty_store();
        let id = add_ok(&mut store, "task");
        store.set_category(&id, "Personal").unwrap();

        store
            .apply_category(&id, CategoryOutcome::Resolved("Work".to_string()))
            .unwrap();

        assert_eq!(store.get(&id).unwrap().category.as_deref(), Some("Work"));
    }

    #[test]
    fn corrupt_load_recovers_empty_with_warning() {
        let storage = MemStorage {
            fail_load: true,
            ..MemStorage::default()
        };
        let (store, warn) = TaskStore::load(storage);
        assert!(store.is_empty());
        assert!(warn.is_some());
    }

    #[test]
    fn load_resets_pending_flags() {
        let mut stale = Task::new("interrupted");
        assert!(stale.is_categorizing);
        stale.id = "t1".to_string();

        let (store, warn) = TaskStore::load(MemStorage::with_tasks(vec![stale]));
        assert!(warn.is_none());
        assert!(!store.get("t1").unwrap().is_categorizing);
    }

    #[test]
    fn save_failure_keeps_in_memory_state() {
        let storage = MemStorage {
            fail_save: true,
            ..MemStorage::default()
        };
        let (mut store, _) = TaskStore::load(storage);

        let (id, warn) = store.add("task");
        assert!(id.is_some());
        assert!(warn.unwrap().to_string().contains("save tasks"));
        // the mutation still applied
        assert_eq!(store.len(), 1);

        // the same contract for the Result-returning mutations
        let err = store.toggle(&id.unwrap()).unwrap_err();
        assert!(err.to_string().contains("save tasks"));
        assert!(store.tasks()[0].completed);
    }

    #[test]
    fn contains_text_ignores_case() {
        let mut store = empty_store();
        add_ok(&mut store, "Plan weekend trip");
        assert!(store.contains_text("plan weekend TRIP"));
        assert!(!store.contains_text("Renew passport"));
    }
}
