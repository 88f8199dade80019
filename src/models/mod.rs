pub mod deadline;
pub mod todo;

pub use deadline::Deadline;
pub use todo::{NewTodo, Todo, TodoPatch};
