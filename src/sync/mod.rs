pub mod service;
pub mod session;
pub mod state;

pub use service::{
    LoadState, MutationOutcome, ReconcileStrategy, TodoRow, TodoSync, TodoView,
    LOAD_ERROR_MESSAGE,
};
pub use session::{Draft, EditSession};
pub use state::SyncState;
