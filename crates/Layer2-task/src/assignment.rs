//! Assignment Resolver
//!
//! Task의 capability 태그에 맞는 첫 번째 idle agent(등록 순서)를 찾아
//! 양쪽에 할당을 기록합니다. Agent가 바쁠 뿐인 경우에는 release를 기다릴 수 있습니다.

use crate::registry::AgentRegistry;
use crate::store::TaskStore;
use crate::task::TaskId;
use redwhisper_foundation::{Error, Result};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct AssignmentResolver {
    store: TaskStore,
    registry: AgentRegistry,
}

impl AssignmentResolver {
    pub fn new(store: TaskStore, registry: AgentRegistry) -> Self {
        Self { store, registry }
    }

    /// Assign the task to an idle capable agent, marking the agent `executing`.
    ///
    /// The task keeps its status on every error path.
    pub async fn assign(&self, task_id: &TaskId) -> Result<String> {
        let task = self.store.get_required(task_id).await?;

        if task.is_composite() {
            return Err(Error::Precondition(format!(
                "Task {} is composite; its subtasks are assigned individually",
                task_id
            )));
        }
        if !task.status().is_pre_run() || task.assigned_agent().is_some() {
            return Err(Error::AlreadyAssigned(format!(
                "Task {} is {}",
                task_id,
                task.status()
            )));
        }

        let capability = task.kind.as_str();
        let Some(agent_id) = self.registry.reserve_idle_by_capability(capability).await else {
            // 동시 할당에 진 경우는 AlreadyAssigned
            let current = self.store.get_required(task_id).await?;
            if !current.status().is_pre_run() || current.assigned_agent().is_some() {
                return Err(Error::AlreadyAssigned(format!(
                    "Task {} is {}",
                    task_id,
                    current.status()
                )));
            }
            return Err(Error::NoCapableAgent(capability.to_string()));
        };

        // CAS: the task may have been assigned concurrently since the snapshot
        if let Err(e) = self.store.update(task_id, |t| t.assign(&agent_id)).await {
            debug!(task_id = %task_id, agent_id = %agent_id, "Assignment lost; releasing agent");
            self.registry.release(&agent_id).await;
            return Err(e);
        }

        info!(task_id = %task_id, agent_id = %agent_id, capability, "Task assigned");
        Ok(agent_id)
    }

    /// `assign`, but while a capable agent is only busy, wait for it to be
    /// released instead of failing. `patience` bounds each wait; it restarts
    /// on every release. `NoCapableAgent` is returned once no capable agent
    /// is executing or a wait runs out.
    pub async fn assign_when_available(
        &self,
        task_id: &TaskId,
        patience: Duration,
    ) -> Result<String> {
        let signal = self.registry.release_signal();
        loop {
            // release 신호를 놓치지 않도록 시도 전에 등록
            let released = signal.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            match self.assign(task_id).await {
                Err(Error::NoCapableAgent(capability))
                    if self.registry.has_busy_capable(&capability).await =>
                {
                    debug!(
                        task_id = %task_id,
                        capability = %capability,
                        "Capable agents busy; waiting for release"
                    );
                    if tokio::time::timeout(patience, released).await.is_err() {
                        return Err(Error::NoCapableAgent(capability));
                    }
                }
                other => return other,
            }
        }
    }
}
