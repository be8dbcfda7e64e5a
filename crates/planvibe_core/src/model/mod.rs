mod dates;
mod goal;
mod task;

pub use dates::{format_date, parse_date};
pub use goal::{Goal, GoalCategory, GoalDraft, GoalPatch, Progress};
pub use task::{Task, TaskFormData, TaskPatch, TaskPriority, TaskStatus, normalize_tags};

pub(crate) use dates::optional_date;

/// Accepts an identifier sent either as a JSON string or as a number.
pub(crate) mod string_id {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        })
    }
}
