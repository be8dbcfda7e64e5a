pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod goal_store;
pub mod model;
pub mod remote;
pub mod session;
pub mod storage;
pub mod summary;
pub mod task_store;

pub use backend::{LocalTaskBackend, RemoteTaskBackend, TaskBackend, open_backend};
pub use error::AppError;
pub use goal_store::GoalStore;
pub use task_store::{TaskState, TaskStore};
