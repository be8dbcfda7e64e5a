//! Best-effort key/value persistence.
//!
//! [`Storage`] wraps a [`Medium`] and never lets a fault cross its API:
//! reads degrade to `None` and writes report `false`, with the cause logged.
//! Each [`StorageKey`] holds one whole serialized collection.

pub mod json_store;
pub mod memory;

use crate::error::AppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub use json_store::FileMedium;
pub use memory::MemoryMedium;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Tasks,
    Session,
}

impl StorageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "planvibe_tasks",
            Self::Session => "planvibe_session",
        }
    }
}

/// Raw text storage. Implementations report faults; [`Storage`] swallows them.
pub trait Medium {
    fn read(&self, key: &str) -> Result<Option<String>, AppError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&mut self, key: &str) -> Result<(), AppError>;
    fn clear(&mut self) -> Result<(), AppError>;
}

impl<M: Medium + ?Sized> Medium for Box<M> {
    fn read(&self, key: &str) -> Result<Option<String>, AppError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        (**self).remove(key)
    }

    fn clear(&mut self) -> Result<(), AppError> {
        (**self).clear()
    }
}

pub struct Storage<M: Medium> {
    medium: M,
}

impl<M: Medium> Storage<M> {
    pub fn new(medium: M) -> Self {
        Self { medium }
    }

    pub fn get<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let raw = match self.medium.read(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "failed to read from storage");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "discarding unreadable stored value");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: StorageKey, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "failed to serialize value for storage");
                return false;
            }
        };

        match self.medium.write(key.as_str(), &raw) {
            Ok(()) => {
                debug!(key = key.as_str(), bytes = raw.len(), "stored value");
                true
            }
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "failed to write to storage");
                false
            }
        }
    }

    pub fn remove(&mut self, key: StorageKey) -> bool {
        match self.medium.remove(key.as_str()) {
            Ok(()) => true,
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "failed to remove from storage");
                false
            }
        }
    }

    pub fn clear(&mut self) -> bool {
        match self.medium.clear() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to clear storage");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryMedium, Medium, Storage, StorageKey};
    use crate::model::{Task, TaskPriority, TaskStatus};
    use time::macros::{date, datetime};

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            description: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: Some(date!(2024 - 03 - 20)),
            tags: vec!["work".to_string()],
            created_at: datetime!(2024-03-01 09:00 UTC),
            updated_at: datetime!(2024-03-01 09:00 UTC),
        }
    }

    #[test]
    fn collections_survive_set_then_get() {
        let mut storage = Storage::new(MemoryMedium::new());
        for collection in [vec![], vec![task("a")], vec![task("a"), task("b"), task("c")]] {
            assert!(storage.set(StorageKey::Tasks, &collection));
            let loaded: Vec<Task> = storage.get(StorageKey::Tasks).unwrap();
            assert_eq!(loaded, collection);
        }
    }

    #[test]
    fn get_missing_key_is_absent() {
        let storage = Storage::new(MemoryMedium::new());
        assert!(storage.get::<Vec<Task>>(StorageKey::Tasks).is_none());
    }

    #[test]
    fn get_corrupt_value_is_absent() {
        let mut medium = MemoryMedium::new();
        medium
            .write(StorageKey::Tasks.as_str(), "{ not json")
            .unwrap();
        let storage = Storage::new(medium);

        assert!(storage.get::<Vec<Task>>(StorageKey::Tasks).is_none());
    }

    #[test]
    fn set_over_quota_reports_false() {
        let mut storage = Storage::new(MemoryMedium::with_quota(16));
        assert!(!storage.set(StorageKey::Tasks, &vec![task("a")]));
        assert!(storage.get::<Vec<Task>>(StorageKey::Tasks).is_none());
    }

    #[test]
    fn remove_and_clear_report_success() {
        let mut storage = Storage::new(MemoryMedium::new());
        assert!(storage.set(StorageKey::Tasks, &vec![task("a")]));
        assert!(storage.set(StorageKey::Session, &"token"));

        assert!(storage.remove(StorageKey::Tasks));
        assert!(storage.get::<Vec<Task>>(StorageKey::Tasks).is_none());
        assert!(storage.remove(StorageKey::Tasks));

        assert!(storage.clear());
        assert!(storage.get::<String>(StorageKey::Session).is_none());
    }
}
