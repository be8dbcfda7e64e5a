//! `/tasks` resource.
//!
//! Wire mapping: snake_case field names, title-case status and priority
//! labels (`To Do`, `In Progress`, `Done`; `Low`, `Medium`, `High`),
//! `due_date` as `YYYY-MM-DD`, or an empty string when unset. Records may
//! come back with numeric ids and without `tags`; missing tags fall back to
//! what was sent.

use super::{Ack, ApiClient, path_id};
use crate::error::AppError;
use crate::model::{Task, TaskPriority, TaskStatus, normalize_tags, optional_date, string_id};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

#[derive(Debug, Serialize)]
struct TaskInput<'a> {
    title: &'a str,
    description: &'a str,
    #[serde(serialize_with = "optional_date::serialize_wire")]
    due_date: Option<Date>,
    status: &'static str,
    priority: &'static str,
    user_id: u64,
    tags: &'a [String],
}

impl<'a> TaskInput<'a> {
    fn from_task(task: &'a Task, owner_id: u64) -> Self {
        Self {
            title: &task.title,
            description: task.description.as_deref().unwrap_or(""),
            due_date: task.due_date,
            status: task.status.wire_label(),
            priority: task.priority.wire_label(),
            user_id: owner_id,
            tags: &task.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(deserialize_with = "string_id::deserialize")]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default, with = "optional_date")]
    due_date: Option<Date>,
    status: String,
    priority: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl TaskRecord {
    fn into_task(self, sent: Option<&Task>) -> Result<Task, AppError> {
        let status = TaskStatus::parse_label(&self.status).ok_or_else(|| {
            AppError::invalid_data(format!("task {} has unknown status '{}'", self.id, self.status))
        })?;
        let priority = TaskPriority::parse_label(&self.priority).ok_or_else(|| {
            AppError::invalid_data(format!(
                "task {} has unknown priority '{}'",
                self.id, self.priority
            ))
        })?;

        let now = OffsetDateTime::now_utc();
        let created_at = match self.created_at.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => sent.map(|task| task.created_at).unwrap_or(now),
        };
        let updated_at = match self.updated_at.as_deref() {
            Some(raw) => parse_timestamp(raw)?,
            None => sent.map(|task| task.updated_at).unwrap_or(created_at),
        };
        let tags = match self.tags {
            Some(tags) => normalize_tags(tags),
            None => sent.map(|task| task.tags.clone()).unwrap_or_default(),
        };
        let description = Some(self.description.trim().to_string()).filter(|text| !text.is_empty());

        Ok(Task {
            id: self.id,
            title: self.title,
            description,
            status,
            priority,
            due_date: self.due_date,
            tags,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|_| AppError::invalid_data(format!("timestamp must be RFC3339, got '{raw}'")))
}

pub fn list(client: &ApiClient, owner_id: u64) -> Result<Vec<Task>, AppError> {
    let records: Vec<TaskRecord> = client.get(&format!("/tasks?user_id={owner_id}"))?;
    records
        .into_iter()
        .map(|record| record.into_task(None))
        .collect()
}

pub fn create(client: &ApiClient, owner_id: u64, task: &Task) -> Result<Task, AppError> {
    let record: TaskRecord = client.post("/tasks", &TaskInput::from_task(task, owner_id))?;
    record.into_task(Some(task))
}

/// The backend replaces every field, so the full merged record is sent.
pub fn update(client: &ApiClient, owner_id: u64, id: &str, task: &Task) -> Result<Task, AppError> {
    let id = path_id(id)?;
    let record: TaskRecord =
        client.put(&format!("/tasks/{id}"), &TaskInput::from_task(task, owner_id))?;
    record.into_task(Some(task))
}

pub fn delete(client: &ApiClient, id: &str) -> Result<Ack, AppError> {
    let id = path_id(id)?;
    client.delete(&format!("/tasks/{id}"))
}
