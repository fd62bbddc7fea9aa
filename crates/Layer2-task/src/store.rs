//! In-memory task store
//!
//! 모든 변경은 write lock 안에서 실행됩니다. 상태 전이는 같은 임계 구역에서
//! 관찰한 상태에 대한 compare-and-set 입니다. Task는 삭제되지 않습니다.

use crate::state::TaskStatus;
use crate::task::{Task, TaskId};
use redwhisper_foundation::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Tasks plus their creation order
#[derive(Debug, Default)]
pub(crate) struct TaskTable {
    tasks: HashMap<TaskId, Task>,
    order: Vec<TaskId>,
}

impl TaskTable {
    pub(crate) fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(id)
    }

    pub(crate) fn required_mut(&mut self, id: &TaskId) -> Result<&mut Task> {
        self.tasks
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))
    }

    fn insert(&mut self, task: Task) {
        if !self.tasks.contains_key(&task.id) {
            self.order.push(task.id);
        }
        self.tasks.insert(task.id, task);
    }
}

/// Counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub created: usize,
    pub assigned: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskStats {
    fn record(&mut self, status: TaskStatus) {
        self.total += 1;
        match status {
            TaskStatus::Created => self.created += 1,
            TaskStatus::Assigned => self.assigned += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
        }
    }

    pub fn terminal(&self) -> usize {
        self.completed + self.failed
    }
}

/// Shared task store
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    inner: Arc<RwLock<TaskTable>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn insert(&self, task: Task) -> TaskId {
        let id = task.id;
        self.inner.write().await.insert(task);
        id
    }

    /// Insert a parent together with its subtasks in one critical section
    pub(crate) async fn insert_family(&self, parent: Task, subtasks: Vec<Task>) -> TaskId {
        let id = parent.id;
        let mut table = self.inner.write().await;
        table.insert(parent);
        for subtask in subtasks {
            table.insert(subtask);
        }
        id
    }

    /// Snapshot of one task
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.inner.read().await.get(id).cloned()
    }

    pub async fn get_required(&self, id: &TaskId) -> Result<Task> {
        self.get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))
    }

    /// Apply `f` to one task under the write lock and return a snapshot
    pub(crate) async fn update<R>(
        &self,
        id: &TaskId,
        f: impl FnOnce(&mut Task) -> Result<R>,
    ) -> Result<(R, Task)> {
        let mut table = self.inner.write().await;
        let task = table.required_mut(id)?;
        let out = f(task)?;
        Ok((out, task.clone()))
    }

    /// Exclusive access for multi-task updates (parent rollup)
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, TaskTable> {
        self.inner.write().await
    }

    /// All tasks in creation order
    pub async fn list(&self) -> Vec<Task> {
        let table = self.inner.read().await;
        table
            .order
            .iter()
            .filter_map(|id| table.tasks.get(id).cloned())
            .collect()
    }

    /// Subtasks of a composite task, in decomposition order
    pub async fn subtasks_of(&self, id: &TaskId) -> Result<Vec<Task>> {
        let table = self.inner.read().await;
        let parent = table
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))?;

        Ok(parent
            .subtasks()
            .iter()
            .filter_map(|sub| table.get(sub).cloned())
            .collect())
    }

    pub async fn stats(&self) -> TaskStats {
        let table = self.inner.read().await;
        let mut stats = TaskStats::default();
        for task in table.tasks.values() {
            stats.record(task.status());
        }
        stats
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
