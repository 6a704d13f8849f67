use super::TaskStore;
use crate::core::Task;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Volatile store, used by tests and when no persistence is wanted
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn get(&self, id: &str) -> Option<Task> {
        let tasks = match self.tasks.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.get(id).cloned()
    }

    fn set(&self, task: Task) {
        let mut tasks = match self.tasks.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.insert(task.id.clone(), task);
    }

    fn delete(&self, id: &str) -> bool {
        let mut tasks = match self.tasks.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.remove(id).is_some()
    }

    fn list(&self) -> Vec<Task> {
        let tasks = match self.tasks.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.values().cloned().collect()
    }
}
