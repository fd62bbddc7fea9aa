//! Execution Coordinator
//!
//! `created -> assigned -> in_progress -> completed|failed` 전이를 구동하고
//! subtask 결과를 composite 부모로 rollup 합니다.
//! Agent 에러, panic, timeout은 모두 `failed`로 끝나며 호출자에게 전파되지 않습니다.

use crate::agent::{AgentOutput, RunStatus, SecurityAgent};
use crate::aggregator::ResultAggregator;
use crate::assignment::AssignmentResolver;
use crate::registry::AgentRegistry;
use crate::state::TaskStatus;
use crate::store::TaskStore;
use crate::task::{Task, TaskId, TaskResult};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use redwhisper_foundation::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Executable agents by id
pub type AgentPool = Arc<RwLock<HashMap<String, Arc<dyn SecurityAgent>>>>;

#[derive(Clone)]
pub struct ExecutionCoordinator {
    store: TaskStore,
    registry: AgentRegistry,
    resolver: AssignmentResolver,
    agents: AgentPool,
    execution_timeout: Duration,
    max_concurrent_subtasks: usize,
}

impl ExecutionCoordinator {
    pub fn new(store: TaskStore, registry: AgentRegistry, agents: AgentPool) -> Self {
        let resolver = AssignmentResolver::new(store.clone(), registry.clone());
        Self {
            store,
            registry,
            resolver,
            agents,
            execution_timeout: Duration::from_secs(300),
            max_concurrent_subtasks: 5,
        }
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_subtasks(mut self, max: usize) -> Self {
        self.max_concurrent_subtasks = max.max(1);
        self
    }

    pub fn resolver(&self) -> &AssignmentResolver {
        &self.resolver
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// `assigned -> in_progress`
    pub async fn start(&self, task_id: &TaskId) -> Result<()> {
        self.store.update(task_id, |t| t.start()).await?;
        info!(task_id = %task_id, "Task started");
        Ok(())
    }

    /// `in_progress -> completed`. Returns `false` when the task was already
    /// terminal (no-op).
    pub async fn complete(&self, task_id: &TaskId, output: AgentOutput) -> Result<bool> {
        let findings = output.findings.len();
        let (changed, task) = self.store.update(task_id, |t| t.complete(output)).await?;
        if changed {
            let duration_ms = task.duration().map(|d| d.as_millis() as u64);
            info!(task_id = %task_id, findings, duration_ms, "Task completed");
            self.settle(&task).await;
        }
        Ok(changed)
    }

    /// Any non-terminal status `-> failed`. Returns `false` when already terminal.
    pub async fn fail(&self, task_id: &TaskId, error: impl Into<String>) -> Result<bool> {
        let error = error.into();
        let (changed, task) = self
            .store
            .update(task_id, |t| Ok(t.fail(error.clone())))
            .await?;
        if changed {
            let duration_ms = task.duration().map(|d| d.as_millis() as u64);
            warn!(task_id = %task_id, error = %error, duration_ms, "Task failed");
            self.settle(&task).await;
        }
        Ok(changed)
    }

    /// Post-terminal bookkeeping: free the agent, then check the parent
    async fn settle(&self, task: &Task) {
        if let Some(agent_id) = task.assigned_agent() {
            self.registry.release(agent_id).await;
        }
        if let Some(parent_id) = task.parent {
            self.roll_up(&parent_id).await;
        }
    }

    /// Settle a composite parent once every subtask is terminal. Runs under
    /// the store write lock so racing subtask completions see one outcome.
    pub async fn roll_up(&self, parent_id: &TaskId) -> Option<TaskStatus> {
        let mut table = self.store.write().await;

        let parent = table.get(parent_id)?;
        if parent.is_terminal() || !parent.is_composite() || parent.subtasks().is_empty() {
            return None;
        }
        let subtasks: Vec<Task> = parent
            .subtasks()
            .iter()
            .filter_map(|id| table.get(id).cloned())
            .collect();
        if subtasks.len() != parent.subtasks().len() || !subtasks.iter().all(Task::is_terminal) {
            return None;
        }

        let failed: Vec<&Task> = subtasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Failed)
            .collect();
        let aggregated = failed
            .is_empty()
            .then(|| ResultAggregator::roll_up(parent, &subtasks));

        let parent = table.get_mut(parent_id)?;
        match aggregated {
            Some(aggregated) => {
                parent.roll_up_completed(aggregated);
                info!(task_id = %parent_id, subtasks = subtasks.len(), "Composite task completed");
            }
            None => {
                let reasons = failed
                    .iter()
                    .map(|t| format!("{} ({}): {}", t.kind, t.id, t.error().unwrap_or("unknown error")))
                    .collect::<Vec<_>>()
                    .join("; ");
                parent.fail(format!(
                    "{} of {} subtasks failed: {}",
                    failed.len(),
                    subtasks.len(),
                    reasons
                ));
                warn!(task_id = %parent_id, failed = failed.len(), "Composite task failed");
            }
        }
        Some(parent.status())
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run a task to a terminal state. A pre-run leaf is assigned first;
    /// a composite runs each of its non-terminal subtasks.
    pub async fn execute(&self, task_id: &TaskId) -> Result<TaskResult> {
        let task = self.store.get_required(task_id).await?;

        if task.is_composite() {
            return self.execute_composite(task).await;
        }
        if task.is_terminal() {
            return Ok(TaskResult::from_task(&task));
        }
        if task.status() == TaskStatus::Created {
            self.resolver.assign(task_id).await?;
        }
        self.execute_leaf(task_id).await
    }

    async fn execute_leaf(&self, task_id: &TaskId) -> Result<TaskResult> {
        self.start(task_id).await?;
        let task = self.store.get_required(task_id).await?;
        let agent_id = task
            .assigned_agent()
            .ok_or_else(|| Error::Precondition(format!("Task {} has no agent", task_id)))?
            .to_string();

        let agent = self.agents.read().get(&agent_id).cloned();
        match agent {
            Some(agent) => {
                let outcome = self.invoke(agent, task).await;
                match outcome {
                    Ok(output) => {
                        if let Err(e) = self.complete(task_id, output).await {
                            // status moved underneath us; make sure it still terminates
                            error!(task_id = %task_id, error = %e, "Could not record completion");
                            self.fail(task_id, e.to_string()).await?;
                        }
                    }
                    Err(reason) => {
                        self.fail(task_id, reason).await?;
                    }
                }
            }
            None => {
                self.fail(task_id, format!("No executor attached for agent '{}'", agent_id))
                    .await?;
            }
        }

        let task = self.store.get_required(task_id).await?;
        Ok(TaskResult::from_task(&task))
    }

    /// Call the agent with a timeout. The error side is the text recorded on
    /// the failed task.
    async fn invoke(
        &self,
        agent: Arc<dyn SecurityAgent>,
        task: Task,
    ) -> std::result::Result<AgentOutput, String> {
        let task_id = task.id;
        let timeout = self.execution_timeout;
        debug!(task_id = %task_id, agent_id = %agent.id(), "Invoking agent");

        let mut handle = tokio::spawn(async move { agent.execute(&task).await });

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(Ok(output))) => match output.status {
                RunStatus::Completed => Ok(output),
                RunStatus::Failed { reason } => Err(reason),
            },
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(join_error)) => Err(format!("Agent execution aborted: {}", join_error)),
            Err(_) => {
                handle.abort();
                Err(Error::Timeout(format!(
                    "Agent execution exceeded {}s",
                    timeout.as_secs_f64()
                ))
                .to_string())
            }
        }
    }

    async fn execute_composite(&self, parent: Task) -> Result<TaskResult> {
        let parent_id = parent.id;
        if !parent.is_terminal() {
            info!(
                task_id = %parent_id,
                subtasks = parent.subtasks().len(),
                "Executing composite task"
            );
            stream::iter(parent.subtasks().to_vec())
                .map(|id| self.run_subtask(id))
                .buffer_unordered(self.max_concurrent_subtasks)
                .collect::<Vec<()>>()
                .await;
            self.roll_up(&parent_id).await;
        }

        let parent = self.store.get_required(&parent_id).await?;
        let subtasks = self.store.subtasks_of(&parent_id).await?;
        Ok(TaskResult::from_family(&parent, &subtasks))
    }

    /// Every error becomes a failed subtask so the parent always settles.
    /// Subtasks sharing a busy agent wait for it (one execution timeout per wait).
    async fn run_subtask(&self, id: TaskId) {
        let result = match self.store.get_required(&id).await {
            Ok(task) if task.is_terminal() => return,
            Ok(task) if task.status() == TaskStatus::Created => {
                match self
                    .resolver
                    .assign_when_available(&id, self.execution_timeout)
                    .await
                {
                    Ok(_) => self.execute_leaf(&id).await.map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            Ok(_) => self.execute_leaf(&id).await.map(|_| ()),
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(task_id = %id, error = %e, "Subtask could not run");
            if let Err(e) = self.fail(&id, e.to_string()).await {
                error!(task_id = %id, error = %e, "Could not fail subtask");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decomposer::TaskDecomposer;
    use crate::finding::Finding;
    use crate::registry::{AgentDescriptor, AgentStatus};
    use crate::task::TaskKind;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::collections::BTreeSet;

    enum Behavior {
        Findings(Vec<Finding>),
        Error,
        Sleep(Duration),
        Panic,
    }

    struct StubAgent {
        id: String,
        capabilities: BTreeSet<String>,
        behavior: Behavior,
    }

    impl StubAgent {
        fn new(id: &str, capability: &str, behavior: Behavior) -> Self {
            Self {
                id: id.to_string(),
                capabilities: [capability.to_string()].into_iter().collect(),
                behavior,
            }
        }
    }

    #[async_trait]
    impl SecurityAgent for StubAgent {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            &self.id
        }

        fn capabilities(&self) -> &BTreeSet<String> {
            &self.capabilities
        }

        async fn execute(&self, _task: &Task) -> Result<AgentOutput> {
            match &self.behavior {
                Behavior::Findings(f) => Ok(AgentOutput::completed(f.clone())),
                Behavior::Error => Err(Error::external("insight", "provider unreachable")),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(AgentOutput::completed(vec![]))
                }
                Behavior::Panic => panic!("agent crashed"),
            }
        }
    }

    struct Fixture {
        store: TaskStore,
        registry: AgentRegistry,
        coordinator: ExecutionCoordinator,
    }

    async fn fixture(agents: Vec<StubAgent>) -> Fixture {
        let store = TaskStore::new();
        let registry = AgentRegistry::new();
        let pool: AgentPool = Arc::default();
        for agent in agents {
            registry
                .register(AgentDescriptor::new(agent.id.clone(), agent.capabilities.clone()))
                .await;
            pool.write().insert(agent.id.clone(), Arc::new(agent));
        }
        let coordinator = ExecutionCoordinator::new(store.clone(), registry.clone(), pool)
            .with_execution_timeout(Duration::from_millis(200));
        Fixture {
            store,
            registry,
            coordinator,
        }
    }

    fn leaf(kind: TaskKind) -> Task {
        Task::new(kind, "http://target", Map::new())
    }

    #[tokio::test]
    async fn test_execute_leaf_completes_and_releases() {
        let f = fixture(vec![StubAgent::new(
            "xss-agent-1",
            "xss",
            Behavior::Findings(vec![Finding::new("Reflected XSS", "high", "d")]),
        )])
        .await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.findings.len(), 1);
        assert!(result.error.is_none());

        let task = f.store.get_required(&id).await.unwrap();
        assert!(task.started_at().is_some());
        assert!(task.completed_at().is_some());
        assert!(task.duration().is_some());
        assert_eq!(
            f.registry.get("xss-agent-1").await.unwrap().status,
            AgentStatus::Idle
        );
    }

    #[tokio::test]
    async fn test_agent_error_becomes_failed() {
        let f = fixture(vec![StubAgent::new("a", "xss", Behavior::Error)]).await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.error.unwrap().contains("provider unreachable"));
        assert!(f.store.get_required(&id).await.unwrap().results().is_none());
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed() {
        let f = fixture(vec![StubAgent::new(
            "a",
            "xss",
            Behavior::Sleep(Duration::from_secs(5)),
        )])
        .await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.error.unwrap().contains("exceeded"));
        assert_eq!(f.registry.get("a").await.unwrap().status, AgentStatus::Idle);
    }

    #[tokio::test]
    async fn test_panic_becomes_failed() {
        let f = fixture(vec![StubAgent::new("a", "xss", Behavior::Panic)]).await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_executor_fails_task() {
        let f = fixture(vec![]).await;
        f.registry.register(AgentDescriptor::new("ghost", ["xss"])).await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.error.unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_execute_without_capable_agent_propagates() {
        let f = fixture(vec![]).await;
        let id = f.store.insert(leaf(TaskKind::Phishing)).await;

        assert!(matches!(
            f.coordinator.execute(&id).await,
            Err(Error::NoCapableAgent(_))
        ));
        assert_eq!(f.store.get_required(&id).await.unwrap().status(), TaskStatus::Created);
    }

    #[tokio::test]
    async fn test_start_requires_assignment() {
        let f = fixture(vec![]).await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;
        assert!(matches!(f.coordinator.start(&id).await, Err(Error::Precondition(_))));
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let f = fixture(vec![StubAgent::new("a", "xss", Behavior::Error)]).await;
        let id = f.store.insert(leaf(TaskKind::Xss)).await;
        f.coordinator.resolver().assign(&id).await.unwrap();
        f.coordinator.start(&id).await.unwrap();

        let output = AgentOutput::completed(vec![Finding::new("x", "low", "d")]);
        assert!(f.coordinator.complete(&id, output.clone()).await.unwrap());
        assert!(!f
            .coordinator
            .complete(&id, AgentOutput::completed(vec![]))
            .await
            .unwrap());
        assert!(!f.coordinator.fail(&id, "late").await.unwrap());

        let task = f.store.get_required(&id).await.unwrap();
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.results(), Some(&output));
    }

    async fn composite(f: &Fixture, tests: serde_json::Value) -> TaskId {
        let mut params = Map::new();
        params.insert("tests".into(), tests);
        let mut parent = Task::new(TaskKind::Comprehensive, "http://dvwa/", params);
        let subtasks = TaskDecomposer::decompose(&mut parent).unwrap();
        f.store.insert_family(parent, subtasks).await
    }

    #[tokio::test]
    async fn test_composite_rollup_completed() {
        let f = fixture(vec![
            StubAgent::new(
                "sql",
                "sql_injection",
                Behavior::Findings(vec![Finding::new("SQLi", "high", "d")]),
            ),
            StubAgent::new(
                "xss",
                "xss",
                Behavior::Findings(vec![Finding::new("Stored XSS", "critical", "d")]),
            ),
        ])
        .await;
        let id = composite(&f, json!(["sql_injection", "xss"])).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.findings.len(), 2);

        let parent = f.store.get_required(&id).await.unwrap();
        let aggregated = parent.aggregated_results().unwrap();
        assert_eq!(aggregated.subtask_results.len(), 2);
        assert_eq!(aggregated.report.executive_summary.total_findings, 2);
        assert!(parent.completed_at().is_some());
    }

    #[tokio::test]
    async fn test_composite_fails_after_all_terminal() {
        let f = fixture(vec![StubAgent::new(
            "sql",
            "sql_injection",
            Behavior::Findings(vec![Finding::new("SQLi", "high", "d")]),
        )])
        .await;
        // no xss agent: that subtask fails at assignment, sql still runs
        let id = composite(&f, json!(["sql_injection", "xss"])).await;

        let result = f.coordinator.execute(&id).await.unwrap();
        assert_eq!(result.status, TaskStatus::Failed);
        assert!(result.error.unwrap().contains("1 of 2"));
        // partial results are kept
        assert_eq!(result.findings.len(), 1);

        let subtasks = f.store.subtasks_of(&id).await.unwrap();
        assert_eq!(subtasks[0].status(), TaskStatus::Completed);
        assert_eq!(subtasks[1].status(), TaskStatus::Failed);
        assert!(f.store.get_required(&id).await.unwrap().aggregated_results().is_none());
    }

    #[tokio::test]
    async fn test_parent_waits_for_every_subtask() {
        let f = fixture(vec![]).await;
        let id = composite(&f, json!(["sql_injection", "xss"])).await;
        let subtasks = f.store.subtasks_of(&id).await.unwrap();

        f.coordinator.fail(&subtasks[0].id, "boom").await.unwrap();
        assert!(!f.store.get_required(&id).await.unwrap().is_terminal());

        f.coordinator.fail(&subtasks[1].id, "boom").await.unwrap();
        assert_eq!(
            f.store.get_required(&id).await.unwrap().status(),
            TaskStatus::Failed
        );
    }
}
