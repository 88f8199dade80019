use std::collections::HashSet;

use tracing::warn;

use crate::models::Todo;

/// The fetched todo list, in the order the remote store returned it.
#[derive(Debug, Default, Clone)]
pub struct SyncState {
    todos: Vec<Todo>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole list with a fresh fetch. Ids stay unique: if the
    /// remote returns a duplicate, the first occurrence wins.
    pub fn seed(&mut self, todos: Vec<Todo>) {
        let mut seen = HashSet::with_capacity(todos.len());
        self.todos = todos
            .into_iter()
            .filter(|todo| {
                let fresh = seen.insert(todo.id.clone());
                if !fresh {
                    warn!("dropping duplicate todo {} from fetch", todo.id);
                }
                fresh
            })
            .collect();
    }

    pub fn append(&mut self, todo: Todo) {
        match self.position(&todo.id) {
            Some(index) => self.todos[index] = todo,
            None => self.todos.push(todo),
        }
    }

    /// Returns false when the id is not present.
    pub fn replace(&mut self, todo: Todo) -> bool {
        match self.position(&todo.id) {
            Some(index) => {
                self.todos[index] = todo;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Todo> {
        self.position(id).map(|index| self.todos.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Remote order.
    pub fn iter(&self) -> impl Iterator<Item = &Todo> {
        self.todos.iter()
    }

    /// Most recently appended first.
    pub fn display_order(&self) -> impl Iterator<Item = &Todo> {
        self.todos.iter().rev()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.todos.iter().position(|todo| todo.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Deadline;

    fn todo(id: &str, text: &str) -> Todo {
        Todo {
            id: id.to_string(),
            text: text.to_string(),
            deadline: Deadline::UNSET,
            completed: false,
        }
    }

    #[test]
    fn seed_drops_duplicate_ids() {
        let mut state = SyncState::new();
        state.seed(vec![todo("1", "first"), todo("2", "two"), todo("1", "again")]);
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("1").unwrap().text, "first");
    }

    #[test]
    fn append_keeps_ids_unique() {
        let mut state = SyncState::new();
        state.seed(vec![todo("1", "a")]);
        state.append(todo("1", "b"));
        state.append(todo("2", "c"));
        assert_eq!(state.len(), 2);
        assert_eq!(state.get("1").unwrap().text, "b");
    }

    #[test]
    fn display_order_is_reversed() {
        let mut state = SyncState::new();
        state.seed(vec![todo("1", "a"), todo("2", "b")]);
        state.append(todo("3", "c"));
        let ids: Vec<&str> = state.display_order().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[test]
    fn replace_and_remove_only_touch_known_ids() {
        let mut state = SyncState::new();
        state.seed(vec![todo("1", "a")]);
        assert!(!state.replace(todo("9", "x")));
        assert!(state.replace(todo("1", "z")));
        assert_eq!(state.get("1").unwrap().text, "z");

        assert!(state.remove("9").is_none());
        assert!(state.remove("1").is_some());
        assert!(state.is_empty());
    }
}
