use std::collections::HashMap;

use crate::error::SyncError;
use crate::models::{Deadline, Todo};

/// Uncommitted field values for one record. Empty text and an unset deadline
/// mean "no change".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub text: String,
    pub deadline: Deadline,
}

/// Tracks the row being edited and the pending values of every row.
///
/// Drafts are keyed by record id, so leaving one row and editing another never
/// carries text or dates across. Completion toggles live in their own buffer
/// because the switch writes to it whether or not a row is being edited.
#[derive(Debug, Default, Clone)]
pub struct EditSession {
    active: Option<String>,
    drafts: HashMap<String, Draft>,
    completion: HashMap<String, bool>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn is_editing(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }

    pub fn draft(&self, id: &str) -> Option<&Draft> {
        self.drafts.get(id)
    }

    pub fn begin_edit(&mut self, id: &str, current_text: &str) {
        self.drafts
            .entry(id.to_string())
            .or_insert_with(|| Draft {
                text: current_text.to_string(),
                deadline: Deadline::UNSET,
            });
        self.active = Some(id.to_string());
    }

    pub fn set_text(&mut self, value: impl Into<String>) -> Result<(), SyncError> {
        let draft = self.active_draft()?;
        draft.text = value.into();
        Ok(())
    }

    pub fn set_date_range(&mut self, deadline: Deadline) -> Result<(), SyncError> {
        let draft = self.active_draft()?;
        draft.deadline = deadline;
        Ok(())
    }

    pub fn set_completed(&mut self, id: &str, completed: bool) {
        self.completion.insert(id.to_string(), completed);
    }

    pub fn completed(&self, id: &str) -> Option<bool> {
        self.completion.get(id).copied()
    }

    /// Drops the active row's draft and goes back to idle.
    pub fn cancel(&mut self) {
        if let Some(id) = self.active.take() {
            self.drafts.remove(&id);
        }
    }

    /// Overwrites the completion buffer with the flags of a fresh fetch.
    /// Toggles that were never committed are lost.
    pub fn reseed_completion<'a>(&mut self, todos: impl IntoIterator<Item = &'a Todo>) {
        self.completion = todos
            .into_iter()
            .map(|todo| (todo.id.clone(), todo.completed))
            .collect();
    }

    /// Builds the record to send for `original`: buffered values where set,
    /// the original's everywhere else. Completion always comes from the
    /// toggle buffer.
    pub fn merge(&self, original: &Todo) -> Todo {
        let mut merged = original.clone();
        if let Some(draft) = self.drafts.get(&original.id) {
            if !draft.text.is_empty() {
                merged.text = draft.text.clone();
            }
            if !draft.deadline.is_unset() {
                merged.deadline = draft.deadline;
            }
        }
        merged.completed = self.completed(&original.id).unwrap_or(original.completed);
        merged
    }

    /// Called after a successful commit of `id`.
    pub fn finish(&mut self, id: &str) {
        self.drafts.remove(id);
        if self.is_editing(id) {
            self.active = None;
        }
    }

    /// Called after `id` was deleted.
    pub fn forget(&mut self, id: &str) {
        self.finish(id);
        self.completion.remove(id);
    }

    fn active_draft(&mut self) -> Result<&mut Draft, SyncError> {
        let id = self.active.as_ref().ok_or(SyncError::NotEditing)?;
        Ok(self.drafts.entry(id.clone()).or_default())
    }
}
