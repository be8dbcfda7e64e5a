use crate::model::{Goal, Progress, Task, TaskPriority, TaskStatus, optional_date, string_id};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use time::Date;

pub const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(default)]
    pub completed_tasks: usize,
    #[serde(default)]
    pub upcoming_tasks: Vec<UpcomingTask>,
    #[serde(default)]
    pub goals_progress: Progress,
    #[serde(default)]
    pub goals: Vec<GoalProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingTask {
    #[serde(deserialize_with = "string_id::deserialize")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default, alias = "due_date", with = "optional_date")]
    pub due_date: Option<Date>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    #[serde(deserialize_with = "string_id::deserialize")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub progress: Progress,
}

impl DashboardSummary {
    /// Builds the dashboard from local collections: unfinished tasks due on or
    /// after `today` (soonest first, higher priority first on ties) and the
    /// mean goal progress.
    pub fn derive(tasks: &[Task], goals: &[Goal], today: Date) -> Self {
        let completed_tasks = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .count();

        let mut upcoming: Vec<&Task> = tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Completed)
            .filter(|task| task.due_date.is_some_and(|due| due >= today))
            .collect();
        upcoming.sort_by_key(|task| (task.due_date, Reverse(task.priority)));

        Self {
            completed_tasks,
            upcoming_tasks: upcoming
                .into_iter()
                .take(UPCOMING_LIMIT)
                .map(|task| UpcomingTask {
                    id: task.id.clone(),
                    title: task.title.clone(),
                    priority: task.priority,
                    due_date: task.due_date,
                })
                .collect(),
            goals_progress: average_progress(goals),
            goals: goals
                .iter()
                .map(|goal| GoalProgress {
                    id: goal.id.clone(),
                    title: goal.title.clone(),
                    progress: goal.progress,
                })
                .collect(),
        }
    }
}

/// Rounded mean of goal progress; zero for no goals.
pub fn average_progress(goals: &[Goal]) -> Progress {
    if goals.is_empty() {
        return Progress::default();
    }
    let total: u32 = goals.iter().map(|goal| u32::from(goal.progress.value())).sum();
    let count = goals.len() as u32;
    Progress::clamped(i64::from((total + count / 2) / count))
}
