use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Deadline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub deadline: Deadline,
    #[serde(default)]
    pub completed: bool,
}

/// Fields a user fills in when creating a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTodo {
    pub text: String,
    #[serde(default)]
    pub deadline: Deadline,
}

impl NewTodo {
    pub fn new(text: impl Into<String>, deadline: Deadline) -> Self {
        Self {
            text: text.into(),
            deadline,
        }
    }

    /// Assigns a fresh identifier. New records always start uncompleted.
    pub fn into_todo(self) -> Todo {
        Todo {
            id: Uuid::new_v4().to_string(),
            text: self.text,
            deadline: self.deadline,
            completed: false,
        }
    }
}

/// A partial update. `None`, an empty text, and an unset deadline all mean
/// "keep the current value".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub deadline: Option<Deadline>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn apply(&self, current: &Todo) -> Todo {
        let mut merged = current.clone();
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            merged.text = text.to_string();
        }
        if let Some(deadline) = self.deadline.filter(|d| !d.is_unset()) {
            merged.deadline = deadline;
        }
        if let Some(completed) = self.completed {
            merged.completed = completed;
        }
        merged
    }
}
