//! Goals are only ever synchronized with the REST backend: every mutation
//! waits for the server's record before touching the local collection.

use crate::error::AppError;
use crate::model::{Goal, GoalCategory, GoalDraft, GoalPatch, Progress};
use crate::remote::{self, ApiClient};
use crate::summary::average_progress;
use tracing::debug;

pub const GOAL_NOT_FOUND: &str = "Goal not found";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalState {
    pub goals: Vec<Goal>,
    pub error: Option<String>,
}

pub struct GoalStore {
    client: ApiClient,
    owner_id: u64,
    state: GoalState,
}

impl GoalStore {
    pub fn new(client: ApiClient, owner_id: u64) -> Self {
        Self {
            client,
            owner_id,
            state: GoalState::default(),
        }
    }

    pub fn open(client: ApiClient, owner_id: u64) -> Self {
        let mut store = Self::new(client, owner_id);
        let _ = store.refresh();
        store
    }

    /// Replaces the collection with the server's; on failure the current
    /// goals are kept and the error is recorded.
    pub fn refresh(&mut self) -> Result<(), AppError> {
        match remote::goals::list(&self.client, self.owner_id) {
            Ok(goals) => {
                debug!(count = goals.len(), "loaded goals");
                self.state.goals = goals;
                self.state.error = None;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn state(&self) -> &GoalState {
        &self.state
    }

    pub fn goals(&self) -> &[Goal] {
        &self.state.goals
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        let id = id.trim();
        self.state.goals.iter().find(|goal| goal.id == id)
    }

    pub fn by_category(&self, category: &GoalCategory) -> Vec<&Goal> {
        self.state
            .goals
            .iter()
            .filter(|goal| &goal.category == category)
            .collect()
    }

    pub fn average_progress(&self) -> Progress {
        average_progress(&self.state.goals)
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    pub fn add(&mut self, draft: GoalDraft) -> Result<Goal, AppError> {
        if let Err(err) = draft.validate() {
            return self.fail(err);
        }
        let created = match remote::goals::create(&self.client, self.owner_id, &draft) {
            Ok(goal) => goal,
            Err(err) => return self.fail(err),
        };
        self.state.goals.retain(|goal| goal.id != created.id);
        self.state.goals.push(created.clone());
        self.state.error = None;
        Ok(created)
    }

    pub fn update(&mut self, id: &str, patch: GoalPatch) -> Result<Goal, AppError> {
        if let Err(err) = patch.validate() {
            return self.fail(err);
        }
        let id = id.trim();
        let Some(index) = self.state.goals.iter().position(|goal| goal.id == id) else {
            return self.fail(AppError::not_found(GOAL_NOT_FOUND));
        };

        let mut merged = self.state.goals[index].clone();
        merged.apply(&patch);
        let updated = match remote::goals::update(&self.client, self.owner_id, id, &merged) {
            Ok(goal) => goal,
            Err(err) => return self.fail(err),
        };
        self.state.goals[index] = updated.clone();
        self.state.error = None;
        Ok(updated)
    }

    pub fn remove(&mut self, id: &str) -> Result<Option<Goal>, AppError> {
        let id = id.trim();
        let Some(index) = self.state.goals.iter().position(|goal| goal.id == id) else {
            self.state.error = None;
            return Ok(None);
        };
        if let Err(err) = remote::goals::delete(&self.client, id) {
            return self.fail(err);
        }
        self.state.error = None;
        Ok(Some(self.state.goals.remove(index)))
    }

    fn fail<T>(&mut self, err: AppError) -> Result<T, AppError> {
        self.state.error = Some(err.message().to_string());
        Err(err)
    }
}
