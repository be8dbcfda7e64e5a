//! Session-owned task collection.
//!
//! All mutation goes through [`TaskStore`]. Each mutating call updates the
//! in-memory collection, hands the whole collection to the backend's
//! write-through, and only then notifies observers.

use crate::backend::TaskBackend;
use crate::clock::{Clock, SystemClock, next_stamp};
use crate::error::AppError;
use crate::model::{Task, TaskFormData, TaskPatch, TaskStatus};
use tracing::{debug, warn};
use uuid::Uuid;

pub const TASK_NOT_FOUND: &str = "Task not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Outcome of the most recent write-through.
    pub last_write_ok: bool,
}

impl Default for TaskState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            is_loading: false,
            error: None,
            last_write_ok: true,
        }
    }
}

type Observer = Box<dyn FnMut(&TaskState)>;

pub struct TaskStore<B: TaskBackend = Box<dyn TaskBackend>> {
    backend: B,
    clock: Box<dyn Clock>,
    state: TaskState,
    load_failure: Option<AppError>,
    observers: Vec<Observer>,
}

impl<B: TaskBackend> TaskStore<B> {
    /// Empty store; call [`TaskStore::hydrate`] or use [`TaskStore::open`] to load.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            clock: Box::new(SystemClock),
            state: TaskState::default(),
            load_failure: None,
            observers: Vec::new(),
        }
    }

    pub fn open(backend: B) -> Self {
        let mut store = Self::new(backend);
        store.hydrate();
        store
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    /// The error from the most recent [`TaskStore::hydrate`], if it failed.
    pub fn load_failure(&self) -> Option<&AppError> {
        self.load_failure.as_ref()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        let id = id.trim();
        self.state.tasks.iter().find(|task| task.id == id)
    }

    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.state
            .tasks
            .iter()
            .filter(|task| task.status == status)
            .collect()
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&TaskState) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Loads the backend's collection. A non-empty result replaces the
    /// current one; a failure is recorded as the session error.
    pub fn hydrate(&mut self) {
        self.set_loading(true);
        self.load_failure = None;
        match self.backend.load() {
            Ok(tasks) if !tasks.is_empty() => {
                debug!(count = tasks.len(), backend = %self.backend.describe(), "hydrated tasks");
                self.state.is_loading = false;
                self.set_all(tasks);
            }
            Ok(_) => self.set_loading(false),
            Err(err) => {
                self.load_failure = Some(err.clone());
                let _ = self.fail::<()>(err);
            }
        }
    }

    pub fn set_all(&mut self, tasks: Vec<Task>) {
        let mut unique: Vec<Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if unique.iter().any(|existing| existing.id == task.id) {
                warn!(id = %task.id, "dropping task with duplicate id");
                continue;
            }
            unique.push(task);
        }
        self.state.tasks = unique;
        self.commit();
    }

    pub fn add(&mut self, form: TaskFormData) -> Result<Task, AppError> {
        if let Err(err) = form.validate() {
            return self.fail(err);
        }

        let id = self.fresh_id();
        let draft = form.into_task(id, self.clock.now());
        let created = match self.backend.create(draft) {
            Ok(task) => task,
            Err(err) => return self.fail(err),
        };
        if self.get(&created.id).is_some() {
            return self.fail(AppError::invalid_data(format!(
                "backend returned duplicate id {}",
                created.id
            )));
        }

        self.state.tasks.push(created.clone());
        self.commit();
        Ok(created)
    }

    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        if let Err(err) = patch.validate() {
            return self.fail(err);
        }

        let id = id.trim();
        let Some(index) = self.state.tasks.iter().position(|task| task.id == id) else {
            return self.fail(AppError::not_found(TASK_NOT_FOUND));
        };

        let mut merged = self.state.tasks[index].clone();
        merged.apply(&patch);
        merged.updated_at = next_stamp(self.clock.as_ref(), merged.updated_at);

        let updated = match self.backend.update(merged) {
            Ok(task) => task,
            Err(err) => return self.fail(err),
        };

        self.state.tasks[index] = updated.clone();
        self.commit();
        Ok(updated)
    }

    /// Removes the task with `id`, returning it. An unknown id is a no-op.
    pub fn remove(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        let id = id.trim();
        let removed = match self.state.tasks.iter().position(|task| task.id == id) {
            Some(index) => {
                if let Err(err) = self.backend.delete(id) {
                    return self.fail(err);
                }
                Some(self.state.tasks.remove(index))
            }
            None => None,
        };

        self.commit();
        Ok(removed)
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.state.is_loading = loading;
        self.notify();
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
        self.notify();
    }

    fn fresh_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    fn commit(&mut self) {
        self.state.error = None;
        self.state.last_write_ok = self.backend.write_through(&self.state.tasks);
        if !self.state.last_write_ok {
            warn!(backend = %self.backend.describe(), "task collection was not persisted");
        }
        self.notify();
    }

    fn fail<T>(&mut self, err: AppError) -> Result<T, AppError> {
        self.state.error = Some(err.message().to_string());
        self.state.is_loading = false;
        self.notify();
        Err(err)
    }

    fn notify(&mut self) {
        for observer in &mut self.observers {
            observer(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TASK_NOT_FOUND, TaskState, TaskStore};
    use crate::backend::{LocalTaskBackend, TaskBackend};
    use crate::clock::manual::ManualClock;
    use crate::error::AppError;
    use crate::model::{Task, TaskFormData, TaskPatch, TaskPriority, TaskStatus};
    use crate::storage::{FileMedium, MemoryMedium, Storage, StorageKey};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use time::Duration;
    use time::macros::{date, datetime};

    /// Backend that records every write-through and can be told to fail.
    #[derive(Clone, Default)]
    struct RecordingBackend {
        initial: Vec<Task>,
        writes: Rc<RefCell<Vec<Vec<Task>>>>,
        reject_with: Option<AppError>,
        persist_ok: bool,
    }

    impl RecordingBackend {
        fn new() -> Self {
            Self {
                persist_ok: true,
                ..Self::default()
            }
        }

        fn write_count(&self) -> usize {
            self.writes.borrow().len()
        }
    }

    impl TaskBackend for RecordingBackend {
        fn describe(&self) -> String {
            "recording".to_string()
        }

        fn load(&mut self) -> Result<Vec<Task>, AppError> {
            match self.reject_with.clone() {
                Some(err) => Err(err),
                None => Ok(self.initial.clone()),
            }
        }

        fn create(&mut self, task: Task) -> Result<Task, AppError> {
            match self.reject_with.clone() {
                Some(err) => Err(err),
                None => Ok(task),
            }
        }

        fn update(&mut self, task: Task) -> Result<Task, AppError> {
            match self.reject_with.clone() {
                Some(err) => Err(err),
                None => Ok(task),
            }
        }

        fn delete(&mut self, _id: &str) -> Result<(), AppError> {
            match self.reject_with.clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn write_through(&mut self, tasks: &[Task]) -> bool {
            self.writes.borrow_mut().push(tasks.to_vec());
            self.persist_ok
        }
    }

    fn draft_report_form() -> TaskFormData {
        TaskFormData {
            title: "Draft report".to_string(),
            description: None,
            priority: TaskPriority::High,
            due_date: Some(date!(2024 - 03 - 20)),
            tags: vec!["work".to_string()],
        }
    }

    fn memory_store() -> TaskStore<LocalTaskBackend<MemoryMedium>> {
        TaskStore::new(LocalTaskBackend::new(Storage::new(MemoryMedium::new())))
    }

    #[test]
    fn add_update_remove_scenario() {
        let clock = ManualClock::at(datetime!(2024-03-15 08:00 UTC));
        let mut store = memory_store().with_clock(clock.clone());

        let created = store.add(draft_report_form()).unwrap();
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(created.status, TaskStatus::Todo);
        assert!(!created.id.is_empty());
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(created.tags, vec!["work".to_string()]);

        clock.advance(Duration::seconds(30));
        let moved = store
            .update(&created.id, TaskPatch::status(TaskStatus::InProgress))
            .unwrap();
        assert_eq!(moved.status, TaskStatus::InProgress);
        assert!(moved.updated_at > created.created_at);
        assert_eq!(moved.created_at, created.created_at);

        let removed = store.remove(&created.id).unwrap();
        assert_eq!(removed.map(|task| task.id), Some(created.id));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn rapid_adds_get_unique_ids() {
        let clock = ManualClock::at(datetime!(2024-03-15 08:00 UTC));
        let mut store = memory_store().with_clock(clock);

        for index in 0..50 {
            store.add(TaskFormData::new(format!("task {index}"))).unwrap();
        }
        let first = store.tasks()[0].id.clone();
        store.remove(&first).unwrap();

        let ids: HashSet<&str> = store.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(store.tasks().len(), 49);
        assert_eq!(ids.len(), 49);
    }

    #[test]
    fn status_update_changes_only_status_and_updated_at() {
        let clock = ManualClock::at(datetime!(2024-03-15 08:00 UTC));
        let mut store = memory_store().with_clock(clock.clone());
        let before = store.add(draft_report_form()).unwrap();

        clock.advance(Duration::minutes(1));
        let after = store
            .update(&before.id, TaskPatch::status(TaskStatus::Completed))
            .unwrap();

        assert_eq!(after.status, TaskStatus::Completed);
        assert_ne!(after.updated_at, before.updated_at);
        assert_eq!(
            Task {
                status: before.status,
                updated_at: before.updated_at,
                ..after
            },
            before
        );
    }

    #[test]
    fn updated_at_advances_even_when_clock_stalls() {
        let clock = ManualClock::at(datetime!(2024-03-15 08:00 UTC));
        let mut store = memory_store().with_clock(clock);
        let created = store.add(draft_report_form()).unwrap();

        let first = store.update(&created.id, TaskPatch::status(TaskStatus::InProgress)).unwrap();
        let second = store.update(&created.id, TaskPatch::status(TaskStatus::Completed)).unwrap();

        assert!(first.updated_at > created.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn update_unknown_id_sets_error_and_keeps_collection() {
        let backend = RecordingBackend::new();
        let mut store = TaskStore::new(backend.clone());
        store.add(draft_report_form()).unwrap();
        let before = store.tasks().to_vec();
        let writes_before = backend.write_count();

        let err = store
            .update("missing", TaskPatch::status(TaskStatus::Completed))
            .unwrap_err();

        assert_eq!(err.code(), "not_found");
        assert_eq!(store.error(), Some(TASK_NOT_FOUND));
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(backend.write_count(), writes_before);
    }

    #[test]
    fn error_persists_through_reads_and_clears_on_success() {
        let mut store = memory_store();
        let created = store.add(draft_report_form()).unwrap();
        store.update("missing", TaskPatch::default()).unwrap_err();

        let _ = store.tasks_by_status(TaskStatus::Todo);
        let _ = store.get(&created.id);
        assert_eq!(store.error(), Some(TASK_NOT_FOUND));

        store.clear_error();
        assert_eq!(store.error(), None);

        store.update("missing", TaskPatch::default()).unwrap_err();
        store
            .update(&created.id, TaskPatch::status(TaskStatus::Completed))
            .unwrap();
        assert_eq!(store.error(), None);
    }

    #[test]
    fn remove_twice_is_idempotent() {
        let mut store = memory_store();
        let created = store.add(draft_report_form()).unwrap();

        assert!(store.remove(&created.id).unwrap().is_some());
        assert!(store.remove(&created.id).unwrap().is_none());
        assert_eq!(store.error(), None);
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn derive_by_status_preserves_order_and_empties_after_completion() {
        let mut store = memory_store();
        let ids: Vec<String> = (0..3)
            .map(|index| store.add(TaskFormData::new(format!("t{index}"))).unwrap().id)
            .collect();

        let todo: Vec<&str> = store
            .tasks_by_status(TaskStatus::Todo)
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(todo, ids.iter().map(String::as_str).collect::<Vec<_>>());

        for id in &ids {
            store.update(id, TaskPatch::status(TaskStatus::Completed)).unwrap();
        }
        assert!(store.tasks_by_status(TaskStatus::Todo).is_empty());
        assert_eq!(store.tasks_by_status(TaskStatus::Completed).len(), 3);
    }

    #[test]
    fn every_mutation_writes_whole_collection_before_observers_run() {
        let backend = RecordingBackend::new();
        let writes = backend.writes.clone();
        let seen: Rc<RefCell<Vec<(usize, usize)>>> = Rc::new(RefCell::new(Vec::new()));
        let mut store = TaskStore::new(backend);
        {
            let seen = seen.clone();
            store.subscribe(move |state: &TaskState| {
                let persisted = writes.borrow().last().map(Vec::len).unwrap_or(0);
                seen.borrow_mut().push((state.tasks.len(), persisted));
            });
        }

        let first = store.add(TaskFormData::new("one")).unwrap();
        store.add(TaskFormData::new("two")).unwrap();
        store.update(&first.id, TaskPatch::status(TaskStatus::InProgress)).unwrap();
        store.remove(&first.id).unwrap();
        store.set_all(Vec::new());

        assert_eq!(store.backend().write_count(), 5);
        assert_eq!(*seen.borrow(), vec![(1, 1), (2, 2), (2, 2), (1, 1), (0, 0)]);
    }

    #[test]
    fn failed_write_through_keeps_mutation_and_flags_it() {
        let mut store = TaskStore::new(LocalTaskBackend::new(Storage::new(
            MemoryMedium::with_quota(8),
        )));

        let created = store.add(draft_report_form()).unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.get(&created.id).map(|task| task.title.as_str()), Some("Draft report"));
        assert!(!store.state().last_write_ok);
        assert_eq!(store.error(), None);
    }

    #[test]
    fn rejected_backend_call_leaves_collection_and_sets_error() {
        let mut backend = RecordingBackend::new();
        backend.reject_with = Some(AppError::remote("Failed to create task"));
        let mut store = TaskStore::new(backend);

        let err = store.add(draft_report_form()).unwrap_err();

        assert_eq!(err.code(), "remote_error");
        assert!(store.tasks().is_empty());
        assert_eq!(store.error(), Some("Failed to create task"));
        assert_eq!(store.backend().write_count(), 0);
    }

    #[test]
    fn add_rejects_blank_title_without_mutation() {
        let mut store = memory_store();
        let err = store.add(TaskFormData::new("  ")).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn open_hydrates_persisted_collection() {
        let dir = tempfile::tempdir().unwrap();
        let created = {
            let mut store =
                TaskStore::open(LocalTaskBackend::new(Storage::new(FileMedium::new(dir.path()))));
            store.add(draft_report_form()).unwrap()
        };

        let reopened =
            TaskStore::open(LocalTaskBackend::new(Storage::new(FileMedium::new(dir.path()))));

        assert_eq!(reopened.tasks(), &[created]);
        assert!(!reopened.state().is_loading);
    }

    #[test]
    fn open_with_corrupt_store_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("planvibe_tasks.json"), "[{\"id\": 1").unwrap();

        let store =
            TaskStore::open(LocalTaskBackend::new(Storage::new(FileMedium::new(dir.path()))));

        assert!(store.tasks().is_empty());
        assert_eq!(store.error(), None);
    }

    #[test]
    fn open_records_load_failure() {
        let mut backend = RecordingBackend::new();
        backend.reject_with = Some(AppError::network("connection refused"));

        let store = TaskStore::open(backend);

        assert!(store.tasks().is_empty());
        assert_eq!(store.error(), Some("connection refused"));
        assert_eq!(store.load_failure().map(AppError::code), Some("network_error"));
        assert!(!store.state().is_loading);
    }

    #[test]
    fn set_all_drops_duplicate_ids() {
        let mut store = memory_store();
        let task = store.add(draft_report_form()).unwrap();
        let mut twin = task.clone();
        twin.title = "twin".to_string();

        store.set_all(vec![task.clone(), twin]);

        assert_eq!(store.tasks(), &[task]);
        let persisted: Vec<Task> = store
            .backend()
            .storage()
            .get(StorageKey::Tasks)
            .unwrap();
        assert_eq!(persisted.len(), 1);
    }
}
