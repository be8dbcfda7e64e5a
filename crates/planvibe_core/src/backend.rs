//! Interchangeable systems of record behind the task store.

use crate::config::{BackendMode, Config};
use crate::error::AppError;
use crate::model::Task;
use crate::remote::auth::Session;
use crate::remote::{self, ApiClient};
use crate::storage::{FileMedium, Medium, Storage, StorageKey};
use serde_json::Value;
use tracing::{debug, warn};

/// `create`/`update`/`delete` return once the change is accepted by the
/// system of record; `write_through` receives the whole collection after
/// every mutation and reports whether it was written.
pub trait TaskBackend {
    fn describe(&self) -> String;
    fn load(&mut self) -> Result<Vec<Task>, AppError>;
    fn create(&mut self, task: Task) -> Result<Task, AppError>;
    fn update(&mut self, task: Task) -> Result<Task, AppError>;
    fn delete(&mut self, id: &str) -> Result<(), AppError>;
    fn write_through(&mut self, tasks: &[Task]) -> bool;
}

impl<B: TaskBackend + ?Sized> TaskBackend for Box<B> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn load(&mut self) -> Result<Vec<Task>, AppError> {
        (**self).load()
    }

    fn create(&mut self, task: Task) -> Result<Task, AppError> {
        (**self).create(task)
    }

    fn update(&mut self, task: Task) -> Result<Task, AppError> {
        (**self).update(task)
    }

    fn delete(&mut self, id: &str) -> Result<(), AppError> {
        (**self).delete(id)
    }

    fn write_through(&mut self, tasks: &[Task]) -> bool {
        (**self).write_through(tasks)
    }
}

/// Local storage is authoritative; the collection lives under one key.
///
/// Stored records that do not decode as a [`Task`] are kept verbatim and
/// written back after the readable ones.
pub struct LocalTaskBackend<M: Medium> {
    storage: Storage<M>,
    unreadable: Vec<Value>,
}

impl<M: Medium> LocalTaskBackend<M> {
    pub fn new(storage: Storage<M>) -> Self {
        Self {
            storage,
            unreadable: Vec::new(),
        }
    }

    /// Records skipped by the last [`TaskBackend::load`].
    pub fn unreadable(&self) -> &[Value] {
        &self.unreadable
    }

    pub fn storage(&self) -> &Storage<M> {
        &self.storage
    }
}

impl<M: Medium> TaskBackend for LocalTaskBackend<M> {
    fn describe(&self) -> String {
        format!("local storage ({})", StorageKey::Tasks.as_str())
    }

    fn load(&mut self) -> Result<Vec<Task>, AppError> {
        let records: Vec<Value> = self.storage.get(StorageKey::Tasks).unwrap_or_default();
        self.unreadable.clear();

        let mut tasks = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Task>(record.clone()) {
                Ok(task) => tasks.push(task),
                Err(err) => {
                    warn!(index, error = %err, "keeping unreadable task record as is");
                    self.unreadable.push(record);
                }
            }
        }
        Ok(tasks)
    }

    fn create(&mut self, task: Task) -> Result<Task, AppError> {
        Ok(task)
    }

    fn update(&mut self, task: Task) -> Result<Task, AppError> {
        Ok(task)
    }

    fn delete(&mut self, _id: &str) -> Result<(), AppError> {
        Ok(())
    }

    fn write_through(&mut self, tasks: &[Task]) -> bool {
        if self.unreadable.is_empty() {
            return self.storage.set(StorageKey::Tasks, tasks);
        }

        let mut records = Vec::with_capacity(tasks.len() + self.unreadable.len());
        for task in tasks {
            match serde_json::to_value(task) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(id = %task.id, error = %err, "task could not be encoded");
                    return false;
                }
            }
        }
        records.extend(self.unreadable.iter().cloned());
        self.storage.set(StorageKey::Tasks, &records)
    }
}

/// The REST backend is authoritative; its records replace local drafts.
pub struct RemoteTaskBackend {
    client: ApiClient,
    owner_id: u64,
}

impl RemoteTaskBackend {
    pub fn new(client: ApiClient, owner_id: u64) -> Self {
        Self { client, owner_id }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

impl TaskBackend for RemoteTaskBackend {
    fn describe(&self) -> String {
        format!("{} (user {})", self.client.base_url(), self.owner_id)
    }

    fn load(&mut self) -> Result<Vec<Task>, AppError> {
        remote::tasks::list(&self.client, self.owner_id)
    }

    fn create(&mut self, task: Task) -> Result<Task, AppError> {
        remote::tasks::create(&self.client, self.owner_id, &task)
    }

    fn update(&mut self, task: Task) -> Result<Task, AppError> {
        remote::tasks::update(&self.client, self.owner_id, &task.id, &task)
    }

    fn delete(&mut self, id: &str) -> Result<(), AppError> {
        let ack = remote::tasks::delete(&self.client, id)?;
        debug!(id, message = %ack.message, "task deleted remotely");
        Ok(())
    }

    fn write_through(&mut self, _tasks: &[Task]) -> bool {
        true
    }
}

/// Picks the backend named by `config`. A remote backend needs an owner id,
/// taken from the config or else from the logged-in session.
pub fn open_backend(
    config: &Config,
    session: Option<&Session>,
) -> Result<Box<dyn TaskBackend>, AppError> {
    match config.backend {
        BackendMode::Local => {
            let medium = FileMedium::new(config.data_dir()?);
            Ok(Box::new(LocalTaskBackend::new(Storage::new(medium))))
        }
        BackendMode::Remote => {
            let client = remote_client(config, session);
            let owner_id = owner_id(config, session)?;
            Ok(Box::new(RemoteTaskBackend::new(client, owner_id)))
        }
    }
}

pub fn remote_client(config: &Config, session: Option<&Session>) -> ApiClient {
    let client = ApiClient::new(config.api_base());
    match session {
        Some(session) => client.with_token(session.token.clone()),
        None => client,
    }
}

pub fn owner_id(config: &Config, session: Option<&Session>) -> Result<u64, AppError> {
    if let Some(user_id) = config.user_id {
        return Ok(user_id);
    }
    match session {
        Some(session) => session.user.owner_id(),
        None => Err(AppError::invalid_input(
            "remote backend needs a user id: run `planvibe login` or set user_id",
        )),
    }
}
