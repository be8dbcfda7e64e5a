use super::{optional_date, string_id};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::Date;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(deserialize_with = "string_id::deserialize")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: GoalCategory,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default, with = "optional_date")]
    pub due_date: Option<Date>,
}

impl Goal {
    pub fn apply(&mut self, patch: &GoalPatch) {
        if let Some(title) = patch.title.as_deref() {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description.as_deref() {
            self.description = description.trim().to_string();
        }
        if let Some(category) = patch.category.as_ref() {
            self.category = category.clone();
        }
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalDraft {
    pub title: String,
    pub description: String,
    pub category: GoalCategory,
    pub progress: Progress,
    pub due_date: Option<Date>,
}

impl GoalDraft {
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<GoalCategory>,
    pub progress: Option<Progress>,
    pub due_date: Option<Option<Date>>,
}

impl GoalPatch {
    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = self.title.as_deref()
            && title.trim().is_empty()
        {
            return Err(AppError::invalid_input("title is required"));
        }
        Ok(())
    }
}

/// Unknown labels are kept verbatim in `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GoalCategory {
    #[default]
    Work,
    Learning,
    Personal,
    Other(String),
}

impl GoalCategory {
    pub fn label(&self) -> &str {
        match self {
            Self::Work => "Work",
            Self::Learning => "Learning",
            Self::Personal => "Personal",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for GoalCategory {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "work" => Self::Work,
            "learning" => Self::Learning,
            "personal" => Self::Personal,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for GoalCategory {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<GoalCategory> for String {
    fn from(category: GoalCategory) -> Self {
        match category {
            GoalCategory::Other(raw) => raw,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for GoalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completion percentage, always within `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Progress(u8);

impl Progress {
    pub const MAX: u8 = 100;

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<i64> for Progress {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Progress> for u8 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
