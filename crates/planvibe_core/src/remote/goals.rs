//! `/goals` resource. Same wire conventions as `/tasks`.

use super::{Ack, ApiClient, path_id};
use crate::error::AppError;
use crate::model::{Goal, GoalDraft, optional_date};
use serde::Serialize;
use time::Date;

#[derive(Debug, Serialize)]
struct GoalInput<'a> {
    title: &'a str,
    description: &'a str,
    category: &'a str,
    progress: u8,
    #[serde(serialize_with = "optional_date::serialize_wire")]
    due_date: Option<Date>,
    user_id: u64,
}

pub fn list(client: &ApiClient, owner_id: u64) -> Result<Vec<Goal>, AppError> {
    client.get(&format!("/goals?user_id={owner_id}"))
}

pub fn create(client: &ApiClient, owner_id: u64, draft: &GoalDraft) -> Result<Goal, AppError> {
    let input = GoalInput {
        title: draft.title.trim(),
        description: draft.description.trim(),
        category: draft.category.label(),
        progress: draft.progress.value(),
        due_date: draft.due_date,
        user_id: owner_id,
    };
    client.post("/goals", &input)
}

pub fn update(client: &ApiClient, owner_id: u64, id: &str, goal: &Goal) -> Result<Goal, AppError> {
    let id = path_id(id)?;
    let input = GoalInput {
        title: &goal.title,
        description: &goal.description,
        category: goal.category.label(),
        progress: goal.progress.value(),
        due_date: goal.due_date,
        user_id: owner_id,
    };
    client.put(&format!("/goals/{id}"), &input)
}

pub fn delete(client: &ApiClient, id: &str) -> Result<Ack, AppError> {
    let id = path_id(id)?;
    client.delete(&format!("/goals/{id}"))
}
