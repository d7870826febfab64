use serde::{Deserialize, Serialize};

use crate::models::{specification::Specification, task::Task};

/// Current schema version
pub const CURRENT_VERSION: u32 = 2;

#[derive(Serialize, Deserialize)]
pub struct Store {
    pub version: u32,
    /// Last issued task id; persisted so ids never collide across sessions
    pub task_id_counter: u64,
    pub tasks: Vec<Task>,
    pub specifications: Vec<Specification>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            task_id_counter: 0,
            tasks: vec![],
            specifications: vec![],
        }
    }
}

impl Store {
    /// Issue the next task id. The caller is responsible for persisting the
    /// store before the id becomes observable, so the increment and the save
    /// act as one read-modify-persist unit.
    pub fn next_task_id(&mut self) -> u64 {
        self.task_id_counter += 1;
        self.task_id_counter
    }

    pub fn get_task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Remove a task, returning it if it existed
    pub fn remove_task(&mut self, id: u64) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    pub fn get_specification(&self, id: &str) -> Option<&Specification> {
        self.specifications.iter().find(|s| s.id == id)
    }

    pub fn get_specification_mut(&mut self, id: &str) -> Option<&mut Specification> {
        self.specifications.iter_mut().find(|s| s.id == id)
    }

    pub fn remove_specification(&mut self, id: &str) -> Option<Specification> {
        let index = self.specifications.iter().position(|s| s.id == id)?;
        Some(self.specifications.remove(index))
    }
}
