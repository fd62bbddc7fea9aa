//! Agent Registry
//!
//! 등록된 agent, capability 태그, liveness를 관리합니다.
//! 등록 순서를 유지하므로 capability 조회는 결정적입니다 (첫 번째 idle 매치).

use chrono::{DateTime, Utc};
use redwhisper_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tracing::{debug, info, warn};

/// Agent liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered but not yet reported ready
    Initializing,
    /// Ready to accept a task
    #[serde(alias = "ready")]
    Idle,
    /// Running a task (owned by the coordinator)
    Executing,
    /// Unhealthy or silent past the heartbeat timeout
    Error,
}

impl AgentStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Idle => "idle",
            Self::Executing => "executing",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique agent ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Capability tags (unique)
    pub capabilities: BTreeSet<String>,
    /// Liveness
    pub status: AgentStatus,
    /// Last heartbeat (registration counts as one)
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

impl AgentDescriptor {
    pub fn new<I, S>(id: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let now = Utc::now();
        Self {
            name: id.clone(),
            id,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            status: AgentStatus::Idle,
            last_heartbeat: now,
            registered_at: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Silence since the last heartbeat
    pub fn silence(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_heartbeat).to_std().unwrap_or_default()
    }
}

/// Agent Registry
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<Vec<AgentDescriptor>>>,
    /// 실행 중이던 agent가 idle로 돌아올 때마다 깨움
    released: Arc<Notify>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent. Re-registering the same id overwrites the prior
    /// descriptor in place (registration order is kept).
    pub async fn register(&self, descriptor: AgentDescriptor) -> AgentDescriptor {
        let mut agents = self.agents.write().await;

        match agents.iter_mut().find(|a| a.id == descriptor.id) {
            Some(existing) => {
                info!(agent_id = %descriptor.id, "Re-registering agent");
                *existing = descriptor.clone();
            }
            None => {
                info!(
                    agent_id = %descriptor.id,
                    capabilities = ?descriptor.capabilities,
                    "Registered agent"
                );
                agents.push(descriptor.clone());
            }
        }

        descriptor
    }

    /// Remove an agent
    pub async fn deregister(&self, agent_id: &str) -> Result<AgentDescriptor> {
        let mut agents = self.agents.write().await;
        let index = agents
            .iter()
            .position(|a| a.id == agent_id)
            .ok_or_else(|| Error::NotFound(format!("Agent '{}'", agent_id)))?;

        info!(agent_id = %agent_id, "Deregistered agent");
        Ok(agents.remove(index))
    }

    /// Record a heartbeat. `executing` belongs to the coordinator: a heartbeat
    /// never clears it, and a reported `executing` is not taken at face value.
    pub async fn heartbeat(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| Error::NotFound(format!("Agent '{}'", agent_id)))?;

        agent.last_heartbeat = Utc::now();
        if agent.status != AgentStatus::Executing && status != AgentStatus::Executing {
            if agent.status != status {
                debug!(agent_id = %agent_id, from = %agent.status, to = %status, "Agent status changed");
            }
            agent.status = status;
        }
        Ok(())
    }

    /// First idle agent (registration order) carrying the capability
    pub async fn find_idle_by_capability(&self, capability: &str) -> Option<String> {
        let agents = self.agents.read().await;
        agents
            .iter()
            .find(|a| a.status.is_available() && a.has_capability(capability))
            .map(|a| a.id.clone())
    }

    /// Find and mark `executing` in one step
    pub async fn reserve_idle_by_capability(&self, capability: &str) -> Option<String> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .iter_mut()
            .find(|a| a.status.is_available() && a.has_capability(capability))?;

        agent.status = AgentStatus::Executing;
        Some(agent.id.clone())
    }

    /// `idle -> executing`. Returns `false` when the agent is not idle.
    pub async fn mark_executing(&self, agent_id: &str) -> Result<bool> {
        let mut agents = self.agents.write().await;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| Error::NotFound(format!("Agent '{}'", agent_id)))?;

        if !agent.status.is_available() {
            return Ok(false);
        }
        agent.status = AgentStatus::Executing;
        Ok(true)
    }

    /// `executing -> idle` after a run. Any other status is kept.
    pub async fn release(&self, agent_id: &str) {
        let mut agents = self.agents.write().await;
        if let Some(agent) = agents.iter_mut().find(|a| a.id == agent_id) {
            if agent.status == AgentStatus::Executing {
                agent.status = AgentStatus::Idle;
                self.released.notify_waiters();
            }
        }
    }

    /// Signal fired on every `executing -> idle` release
    pub(crate) fn release_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.released)
    }

    /// A capable agent exists but is busy right now
    pub async fn has_busy_capable(&self, capability: &str) -> bool {
        let agents = self.agents.read().await;
        agents
            .iter()
            .any(|a| a.status == AgentStatus::Executing && a.has_capability(capability))
    }

    /// Mark agents silent longer than `timeout` as `error`. Executing agents
    /// are left to the coordinator's execution timeout.
    pub async fn sweep_stale(&self, timeout: Duration) -> Vec<String> {
        let now = Utc::now();
        let mut agents = self.agents.write().await;
        let mut stale = Vec::new();

        for agent in agents.iter_mut() {
            let swept = matches!(agent.status, AgentStatus::Idle | AgentStatus::Initializing);
            if swept && agent.silence(now) > timeout {
                warn!(
                    agent_id = %agent.id,
                    silence_secs = agent.silence(now).as_secs(),
                    "Agent heartbeat missed; marking as error"
                );
                agent.status = AgentStatus::Error;
                stale.push(agent.id.clone());
            }
        }

        stale
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentDescriptor> {
        let agents = self.agents.read().await;
        agents.iter().find(|a| a.id == agent_id).cloned()
    }

    pub async fn contains(&self, agent_id: &str) -> bool {
        let agents = self.agents.read().await;
        agents.iter().any(|a| a.id == agent_id)
    }

    /// All descriptors in registration order
    pub async fn list(&self) -> Vec<AgentDescriptor> {
        self.agents.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
