//! Task storage.
//!
//! The engine only sees the [`TaskStore`] trait. Two backends exist:
//! - [`InMemoryTaskStore`] for tests and throwaway runs
//! - [`FileTaskStore`] which mirrors every mutation to a JSON document on disk

mod file;
mod memory;

pub use file::FileTaskStore;
pub use memory::InMemoryTaskStore;

use crate::core::Task;
use async_trait::async_trait;
use std::fmt::Debug;

#[async_trait]
pub trait TaskStore: Debug + Send + Sync {
    fn get(&self, id: &str) -> Option<Task>;

    /// Inserts or replaces the task keyed by `task.id`
    fn set(&self, task: Task);

    /// Returns true if a task was removed
    fn delete(&self, id: &str) -> bool;

    /// All tasks, in no particular order
    fn list(&self) -> Vec<Task>;

    /// Waits until every mutation issued so far has reached stable storage
    async fn flush(&self) {}

    /// Message of the most recent failed write, cleared by the next successful one
    fn persistence_error(&self) -> Option<String> {
        None
    }
}
