//! Task definition and types
//!
//! Lifecycle 필드는 crate 내부 전용입니다. 아래 전이 메서드만 이를 변경하며,
//! 그 메서드는 coordinator/decomposer만 호출합니다.

use crate::agent::AgentOutput;
use crate::aggregator::AggregatedResults;
use crate::finding::Finding;
use crate::state::TaskStatus;
use chrono::{DateTime, Utc};
use redwhisper_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Default priority. Lower numbers are more urgent.
pub const DEFAULT_PRIORITY: i32 = 1;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a full UUID string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| Error::Validation(format!("Invalid task id '{}'", s)))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

// ============================================================================
// Task Kind
// ============================================================================

/// Recognized task types. The tag doubles as the required capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    SqlInjection,
    Xss,
    Phishing,
    /// Composite: expands into one subtask per requested test type
    Comprehensive,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::SqlInjection,
        TaskKind::Xss,
        TaskKind::Phishing,
        TaskKind::Comprehensive,
    ];

    /// Capability tag
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::SqlInjection => "sql_injection",
            TaskKind::Xss => "xss",
            TaskKind::Phishing => "phishing",
            TaskKind::Comprehensive => "comprehensive",
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, TaskKind::Comprehensive)
    }

    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Invalid task type '{}' (expected one of: {})",
                    s,
                    Self::expected()
                ))
            })
    }
}

// ============================================================================
// Task Request
// ============================================================================

/// Input of `CreateTask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Task type tag, validated on creation
    pub task_type: String,
    pub target: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl TaskRequest {
    pub fn new(task_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            target: target.into(),
            description: None,
            parameters: Map::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

// ============================================================================
// Task
// ============================================================================

/// A unit of requested testing work
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,

    /// Task type / required capability
    pub kind: TaskKind,

    /// Human description
    pub description: String,

    /// What is under test
    pub target: String,

    /// Arbitrary parameters (keys unique)
    pub parameters: Map<String, Value>,

    /// Lower is more urgent
    pub priority: i32,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// Owning composite task, for subtasks
    pub parent: Option<TaskId>,

    pub(crate) status: TaskStatus,
    pub(crate) assigned_agent: Option<String>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) error: Option<String>,
    pub(crate) subtasks: Vec<TaskId>,
    pub(crate) results: Option<AgentOutput>,
    pub(crate) aggregated_results: Option<AggregatedResults>,
}

impl Task {
    /// Create a new task in the `created` state
    pub fn new(kind: TaskKind, target: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            description: format!("{} assessment", kind),
            target: target.into(),
            parameters,
            priority: DEFAULT_PRIORITY,
            created_at: Utc::now(),
            parent: None,
            status: TaskStatus::Created,
            assigned_agent: None,
            started_at: None,
            completed_at: None,
            error: None,
            subtasks: Vec::new(),
            results: None,
            aggregated_results: None,
        }
    }

    /// Validate a request and build the task
    pub fn from_request(request: TaskRequest) -> Result<Self> {
        let kind: TaskKind = request.task_type.parse()?;
        if request.target.trim().is_empty() {
            return Err(Error::Validation("Task target must not be empty".to_string()));
        }

        let mut task = Self::new(kind, request.target, request.parameters)
            .with_priority(request.priority);
        if let Some(description) = request.description {
            task.description = description;
        }
        Ok(task)
    }

    /// Subtask inheriting the parent's target, parameters and priority
    pub(crate) fn subtask_of(parent: &Task, kind: TaskKind) -> Self {
        let mut task = Self::new(kind, parent.target.clone(), parent.parameters.clone())
            .with_priority(parent.priority);
        task.description = format!("{} subtask of {}", kind, parent.id);
        task.parent = Some(parent.id);
        task
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn assigned_agent(&self) -> Option<&str> {
        self.assigned_agent.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn subtasks(&self) -> &[TaskId] {
        &self.subtasks
    }

    pub fn results(&self) -> Option<&AgentOutput> {
        self.results.as_ref()
    }

    pub fn aggregated_results(&self) -> Option<&AggregatedResults> {
        self.aggregated_results.as_ref()
    }

    /// Findings produced by the agent run (empty unless completed)
    pub fn findings(&self) -> &[Finding] {
        self.results
            .as_ref()
            .map(|r| r.findings.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_composite(&self) -> bool {
        self.kind.is_composite()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Get execution duration if task has started
    pub fn duration(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.completed_at.unwrap_or_else(Utc::now);
        Some((end - start).to_std().unwrap_or_default())
    }

    // ========================================================================
    // Transitions (compare-and-set on the current status)
    // ========================================================================

    /// `created|assigned -> assigned`; records the agent
    pub(crate) fn assign(&mut self, agent_id: &str) -> Result<()> {
        if self.is_composite() {
            return Err(Error::Precondition(format!(
                "Task {} is composite; its subtasks are assigned individually",
                self.id
            )));
        }
        if self.status != TaskStatus::Created {
            return Err(Error::AlreadyAssigned(format!(
                "Task {} is {}",
                self.id, self.status
            )));
        }
        self.assigned_agent = Some(agent_id.to_string());
        self.status = TaskStatus::Assigned;
        Ok(())
    }

    /// `assigned -> in_progress`
    pub(crate) fn start(&mut self) -> Result<()> {
        if self.assigned_agent.is_none() {
            return Err(Error::Precondition(format!(
                "Cannot start task {} without an assigned agent",
                self.id
            )));
        }
        if !self.status.can_transition_to(TaskStatus::InProgress) {
            return Err(Error::Precondition(format!(
                "Cannot start task {} from status {}",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `in_progress -> completed`. Returns `false` when already terminal.
    pub(crate) fn complete(&mut self, results: AgentOutput) -> Result<bool> {
        if self.status.is_terminal() {
            return Ok(false);
        }
        if !self.status.can_transition_to(TaskStatus::Completed) {
            return Err(Error::Precondition(format!(
                "Cannot complete task {} from status {}",
                self.id, self.status
            )));
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.results = Some(results);
        self.error = None;
        Ok(true)
    }

    /// Any non-terminal status `-> failed`. Returns `false` when already terminal.
    pub(crate) fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        self.results = None;
        true
    }

    /// Composite rollup when every subtask completed
    pub(crate) fn roll_up_completed(&mut self, aggregated: AggregatedResults) -> bool {
        if self.status.is_terminal() || !self.is_composite() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.aggregated_results = Some(aggregated);
        self.error = None;
        true
    }

    /// Subtask ids appended by the decomposer
    pub(crate) fn push_subtask(&mut self, id: TaskId) {
        if !self.subtasks.contains(&id) {
            self.subtasks.push(id);
        }
    }
}

// ============================================================================
// Task Result (caller view)
// ============================================================================

/// What `ExecuteTask` hands back to the caller
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub agent: Option<String>,
    pub findings: Vec<Finding>,
    pub error: Option<String>,
    pub subtask_ids: Vec<TaskId>,
}

impl TaskResult {
    /// View of a leaf task
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            status: task.status,
            agent: task.assigned_agent.clone(),
            findings: task.findings().to_vec(),
            error: task.error.clone(),
            subtask_ids: task.subtasks.clone(),
        }
    }

    /// View of a composite task with the findings of its completed subtasks
    pub fn from_family(parent: &Task, subtasks: &[Task]) -> Self {
        let findings = subtasks
            .iter()
            .filter(|t| t.status.is_success())
            .flat_map(|t| t.findings().iter().cloned())
            .collect();

        Self {
            findings,
            ..Self::from_task(parent)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf() -> Task {
        Task::new(TaskKind::Xss, "http://target/xss_r/", Map::new())
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("sql_injection".parse::<TaskKind>().unwrap(), TaskKind::SqlInjection);
        assert!("comprehensive".parse::<TaskKind>().unwrap().is_composite());

        let err = "csrf".parse::<TaskKind>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("csrf"));
    }

    #[test]
    fn test_from_request_validates() {
        assert!(Task::from_request(TaskRequest::new("xss", "http://t")).is_ok());
        assert!(matches!(
            Task::from_request(TaskRequest::new("ddos", "http://t")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            Task::from_request(TaskRequest::new("xss", "  ")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_new_task_defaults() {
        let task = leaf();
        assert_eq!(task.status(), TaskStatus::Created);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert!(task.assigned_agent().is_none());
        assert!(task.completed_at().is_none());
        assert!(task.subtasks().is_empty());
    }

    #[test]
    fn test_start_requires_agent() {
        let mut task = leaf();
        assert!(matches!(task.start(), Err(Error::Precondition(_))));
        assert_eq!(task.status(), TaskStatus::Created);
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut task = leaf();
        task.assign("xss-agent-1").unwrap();
        assert_eq!(task.status(), TaskStatus::Assigned);

        task.start().unwrap();
        assert_eq!(task.status(), TaskStatus::InProgress);
        assert!(task.started_at().is_some());
        assert!(task.completed_at().is_none());

        assert!(task.complete(AgentOutput::completed(vec![])).unwrap());
        assert_eq!(task.status(), TaskStatus::Completed);
        assert!(task.completed_at().is_some());
        assert!(task.results().is_some());
        assert!(task.error().is_none());
    }

    #[test]
    fn test_assign_twice_is_rejected() {
        let mut task = leaf();
        task.assign("a").unwrap();
        assert!(matches!(task.assign("b"), Err(Error::AlreadyAssigned(_))));
        assert_eq!(task.assigned_agent(), Some("a"));
    }

    #[test]
    fn test_complete_requires_in_progress() {
        let mut task = leaf();
        task.assign("a").unwrap();
        assert!(matches!(
            task.complete(AgentOutput::completed(vec![])),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn test_complete_twice_is_noop() {
        let mut task = leaf();
        task.assign("a").unwrap();
        task.start().unwrap();
        let first = AgentOutput::completed(vec![Finding::new("x", "low", "d")]);
        assert!(task.complete(first.clone()).unwrap());
        let completed_at = task.completed_at();

        assert!(!task.complete(AgentOutput::completed(vec![])).unwrap());
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.results(), Some(&first));
        assert_eq!(task.completed_at(), completed_at);
    }

    #[test]
    fn test_fail_from_any_non_terminal() {
        let mut created = leaf();
        assert!(created.fail("boom"));
        assert_eq!(created.status(), TaskStatus::Failed);
        assert_eq!(created.error(), Some("boom"));
        assert!(created.completed_at().is_some());
        assert!(created.results().is_none());

        // terminal: no-op
        assert!(!created.fail("again"));
        assert_eq!(created.error(), Some("boom"));
    }

    #[test]
    fn test_composite_cannot_be_assigned() {
        let mut task = Task::new(TaskKind::Comprehensive, "http://t", Map::new());
        assert!(matches!(task.assign("a"), Err(Error::Precondition(_))));
    }

    #[test]
    fn test_subtask_inherits_parent() {
        let mut params = Map::new();
        params.insert("tests".into(), json!(["xss"]));
        let parent = Task::new(TaskKind::Comprehensive, "http://t", params).with_priority(3);
        let sub = Task::subtask_of(&parent, TaskKind::Xss);

        assert_eq!(sub.parent, Some(parent.id));
        assert_eq!(sub.target, parent.target);
        assert_eq!(sub.parameters, parent.parameters);
        assert_eq!(sub.priority, 3);
        assert_ne!(sub.id, parent.id);
    }
}
