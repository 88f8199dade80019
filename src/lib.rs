pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod mock;
pub mod models;
pub mod sync;

pub use client::{HttpTodoStore, TodoStore};
pub use error::{ClientError, SyncError};
pub use models::{Deadline, NewTodo, Todo, TodoPatch};
pub use sync::{ReconcileStrategy, TodoSync, TodoView};
