//! Heartbeat monitor
//!
//! Agent마다 독립된 주기 루프(agent id 당 하나)와, 오래 응답 없는 agent를
//! `error`로 표시하는 sweep 루프를 실행합니다. Task 실행과는 분리되어 있습니다.

use crate::agent::SecurityAgent;
use crate::registry::{AgentRegistry, AgentStatus};
use parking_lot::Mutex;
use redwhisper_foundation::Error;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct HeartbeatMonitor {
    registry: AgentRegistry,
    interval: Duration,
    timeout: Duration,
    sweep: Mutex<Option<JoinHandle<()>>>,
    /// agent id -> heartbeat 루프
    loops: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl HeartbeatMonitor {
    pub fn new(registry: AgentRegistry, interval: Duration, timeout: Duration) -> Self {
        Self {
            registry,
            interval,
            timeout,
            sweep: Mutex::new(None),
            loops: Mutex::new(HashMap::new()),
        }
    }

    /// Start the stale sweep and one loop per agent. Must be called inside a
    /// tokio runtime.
    pub fn start(&self, agents: Vec<Arc<dyn SecurityAgent>>) {
        self.spawn_sweep();
        for agent in agents {
            self.watch(agent);
        }
        info!(interval_secs = self.interval.as_secs_f64(), "Heartbeat monitor started");
    }

    /// Spawn the heartbeat loop of one agent, replacing any loop already
    /// running for the same id. The loop ends when the agent is deregistered.
    pub fn watch(&self, agent: Arc<dyn SecurityAgent>) {
        let registry = self.registry.clone();
        let interval = self.interval;
        let agent_id = agent.id().to_string();

        let handle = tokio::spawn({
            let agent_id = agent_id.clone();
            async move {
                let mut timer = tokio::time::interval(interval);

                loop {
                    timer.tick().await;

                    // 응답 없는 health 호출은 Error로 처리
                    let status = tokio::time::timeout(interval, agent.health())
                        .await
                        .unwrap_or(AgentStatus::Error);

                    match registry.heartbeat(&agent_id, status).await {
                        Ok(()) => debug!(agent_id = %agent_id, status = %status, "Heartbeat"),
                        Err(Error::NotFound(_)) => {
                            debug!(agent_id = %agent_id, "Agent deregistered; stopping heartbeat");
                            break;
                        }
                        Err(e) => warn!(agent_id = %agent_id, error = %e, "Heartbeat failed"),
                    }
                }
            }
        });

        if let Some(previous) = self.loops.lock().insert(agent_id.clone(), handle) {
            debug!(agent_id = %agent_id, "Replacing heartbeat loop");
            previous.abort();
        }
    }

    /// Stop the loop of one agent and wait until it can no longer report
    pub async fn unwatch(&self, agent_id: &str) {
        let handle = self.loops.lock().remove(agent_id);
        if let Some(handle) = handle {
            handle.abort();
            // JoinError::Cancelled 예상
            let _ = handle.await;
        }
    }

    fn spawn_sweep(&self) {
        let registry = self.registry.clone();
        let interval = self.interval;
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                let stale = registry.sweep_stale(timeout).await;
                if !stale.is_empty() {
                    warn!(agents = ?stale, "Agents missed their heartbeat");
                }
            }
        });

        if let Some(previous) = self.sweep.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Abort every loop
    pub fn stop(&self) {
        let mut handles: Vec<_> = self.loops.lock().drain().map(|(_, h)| h).collect();
        handles.extend(self.sweep.lock().take());
        if !handles.is_empty() {
            info!(loops = handles.len(), "Stopping heartbeat monitor");
        }
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        let sweeping = self.sweep.lock().as_ref().is_some_and(|h| !h.is_finished());
        sweeping || self.loops.lock().values().any(|h| !h.is_finished())
    }

    /// Number of agents with a live heartbeat loop
    pub fn watched(&self) -> usize {
        self.loops.lock().values().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
