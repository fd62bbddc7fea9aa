//! Orchestrator - 외부 호출자를 위한 단일 진입점
//!
//! Composes the registry, decomposer, resolver, coordinator and aggregator
//! behind the create / assign / execute / report operations.
//!
//! ## 사용 예시
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(OrchestratorConfig::default());
//! orchestrator.register_agent(Arc::new(sql_agent)).await;
//!
//! let id = orchestrator
//!     .create_task("comprehensive", "http://dvwa/vulnerabilities/", params)
//!     .await?;
//! let result = orchestrator.execute_task(&id).await?;
//! let report = orchestrator.get_report(&id).await?;
//! ```

use crate::agent::SecurityAgent;
use crate::aggregator::{AggregateReport, ReportScope, ResultAggregator};
use crate::coordinator::{AgentPool, ExecutionCoordinator};
use crate::decomposer::TaskDecomposer;
use crate::heartbeat::HeartbeatMonitor;
use crate::registry::{AgentDescriptor, AgentRegistry, AgentStatus};
use crate::report::{FormattedReport, JsonReportSink, ReportSink};
use crate::store::{TaskStats, TaskStore};
use crate::task::{Task, TaskId, TaskRequest, TaskResult};
use redwhisper_foundation::{Error, OrchestratorConfig, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct Orchestrator {
    config: OrchestratorConfig,
    store: TaskStore,
    registry: AgentRegistry,
    agents: AgentPool,
    coordinator: ExecutionCoordinator,
    heartbeat: HeartbeatMonitor,
    sink: Arc<dyn ReportSink>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let store = TaskStore::new();
        let registry = AgentRegistry::new();
        let agents: AgentPool = Arc::default();

        let coordinator = ExecutionCoordinator::new(store.clone(), registry.clone(), agents.clone())
            .with_execution_timeout(config.execution_timeout())
            .with_max_concurrent_subtasks(config.max_concurrent_subtasks);
        let heartbeat = HeartbeatMonitor::new(
            registry.clone(),
            config.heartbeat_interval(),
            config.heartbeat_timeout(),
        );
        let sink = Arc::new(JsonReportSink::new(config.report_dir.clone()));

        Self {
            config,
            store,
            registry,
            agents,
            coordinator,
            heartbeat,
            sink,
        }
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sub-second execution bound (the config works in whole seconds)
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.coordinator = self.coordinator.with_execution_timeout(timeout);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn coordinator(&self) -> &ExecutionCoordinator {
        &self.coordinator
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    // ========================================================================
    // Agents
    // ========================================================================

    /// Register an executable agent. Re-registering an id replaces it.
    pub async fn register_agent(&self, agent: Arc<dyn SecurityAgent>) -> AgentDescriptor {
        let descriptor = AgentDescriptor::new(agent.id(), agent.capabilities().iter().cloned())
            .with_name(agent.name());

        // 이전 agent의 루프가 새 descriptor에 보고하지 않도록 먼저 정지
        let watching = self.heartbeat.is_running();
        self.heartbeat.unwatch(agent.id()).await;

        self.agents
            .write()
            .insert(agent.id().to_string(), Arc::clone(&agent));
        let descriptor = self.registry.register(descriptor).await;

        if watching {
            self.heartbeat.watch(agent);
        }
        descriptor
    }

    pub async fn deregister_agent(&self, agent_id: &str) -> Result<AgentDescriptor> {
        self.heartbeat.unwatch(agent_id).await;
        self.agents.write().remove(agent_id);
        self.registry.deregister(agent_id).await
    }

    pub async fn heartbeat(&self, agent_id: &str, status: AgentStatus) -> Result<()> {
        self.registry.heartbeat(agent_id, status).await
    }

    pub async fn list_agents(&self) -> Vec<AgentDescriptor> {
        self.registry.list().await
    }

    /// Start the heartbeat loops for every registered executable agent
    pub fn start_heartbeats(&self) {
        if self.heartbeat.is_running() {
            return;
        }
        let agents: Vec<_> = self.agents.read().values().cloned().collect();
        self.heartbeat.start(agents);
    }

    pub fn stop_heartbeats(&self) {
        self.heartbeat.stop();
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// `CreateTask(type, target, parameters)`
    pub async fn create_task(
        &self,
        task_type: &str,
        target: &str,
        parameters: Map<String, Value>,
    ) -> Result<TaskId> {
        self.create_task_with(TaskRequest::new(task_type, target).with_parameters(parameters))
            .await
    }

    /// Validate, decompose if composite, and store
    pub async fn create_task_with(&self, request: TaskRequest) -> Result<TaskId> {
        let mut task = Task::from_request(request)?;
        let subtasks = TaskDecomposer::decompose(&mut task)?;

        info!(
            task_id = %task.id,
            task_type = %task.kind,
            target = %task.target,
            subtasks = subtasks.len(),
            "Task created"
        );
        Ok(self.store.insert_family(task, subtasks).await)
    }

    /// `AssignTask(id)`
    pub async fn assign_task(&self, task_id: &TaskId) -> Result<String> {
        self.coordinator.resolver().assign(task_id).await
    }

    /// `ExecuteTask(id)`
    pub async fn execute_task(&self, task_id: &TaskId) -> Result<TaskResult> {
        self.coordinator.execute(task_id).await
    }

    /// `GetReport(id)`. Composite tasks report over their completed subtasks.
    pub async fn get_report(&self, task_id: &TaskId) -> Result<AggregateReport> {
        let task = self.store.get_required(task_id).await?;

        if !task.is_composite() {
            if !task.is_terminal() {
                return Err(Error::NotReady(format!("Task {} is {}", task_id, task.status())));
            }
            let scope = ReportScope::for_task(&task, &[]);
            return Ok(ResultAggregator::aggregate(&scope, task.findings()));
        }

        if let Some(aggregated) = task.aggregated_results() {
            return Ok(aggregated.report.clone());
        }

        let subtasks = self.store.subtasks_of(task_id).await?;
        let pending = subtasks.iter().filter(|t| !t.is_terminal()).count();
        if !task.is_terminal() && pending > 0 {
            return Err(Error::NotReady(format!(
                "Task {}: {} of {} subtasks still running",
                task_id,
                pending,
                subtasks.len()
            )));
        }

        let scope = ReportScope::for_task(&task, &subtasks);
        let findings = ResultAggregator::completed_findings(&subtasks);
        Ok(ResultAggregator::aggregate(&scope, &findings))
    }

    /// Persist the report through the sink and return its location
    pub async fn save_report(&self, task_id: &TaskId) -> Result<String> {
        let task = self.store.get_required(task_id).await?;
        let report = self.get_report(task_id).await?;

        let formatted = FormattedReport::new(task.kind.as_str(), report.technical_details.findings);
        self.sink.store(&formatted)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_task(&self, task_id: &TaskId) -> Result<Task> {
        self.store.get_required(task_id).await
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        self.store.list().await
    }

    pub async fn get_subtasks(&self, task_id: &TaskId) -> Result<Vec<Task>> {
        self.store.subtasks_of(task_id).await
    }

    pub async fn task_stats(&self) -> TaskStats {
        self.store.stats().await
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_task_validates_type() {
        let orchestrator = Orchestrator::default();
        let err = orchestrator
            .create_task("csrf", "http://t", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(orchestrator.task_stats().await.total, 0);
    }

    #[tokio::test]
    async fn test_create_comprehensive_stores_family() {
        let orchestrator = Orchestrator::default();
        let mut params = Map::new();
        params.insert("tests".into(), json!(["sql_injection", "xss"]));

        let id = orchestrator
            .create_task("comprehensive", "http://dvwa/", params)
            .await
            .unwrap();

        let subtasks = orchestrator.get_subtasks(&id).await.unwrap();
        assert_eq!(subtasks.len(), 2);
        assert_eq!(orchestrator.list_tasks().await.len(), 3);
        assert_eq!(orchestrator.task_stats().await.created, 3);
    }

    #[tokio::test]
    async fn test_invalid_comprehensive_stores_nothing() {
        let orchestrator = Orchestrator::default();
        let mut params = Map::new();
        params.insert("tests".into(), json!([]));

        assert!(orchestrator
            .create_task("comprehensive", "http://dvwa/", params)
            .await
            .is_err());
        assert!(orchestrator.list_tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_report_not_ready() {
        let orchestrator = Orchestrator::default();
        let id = orchestrator
            .create_task("xss", "http://t", Map::new())
            .await
            .unwrap();

        assert!(matches!(
            orchestrator.get_report(&id).await,
            Err(Error::NotReady(_))
        ));
        assert_eq!(
            orchestrator.get_task(&id).await.unwrap().status(),
            TaskStatus::Created
        );
    }

    #[tokio::test]
    async fn test_assign_unknown_task() {
        let orchestrator = Orchestrator::default();
        assert!(matches!(
            orchestrator.assign_task(&TaskId::new()).await,
            Err(Error::NotFound(_))
        ));
    }
}
