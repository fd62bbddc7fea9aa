//! Agent execution contract
//!
//! 모든 agent 변형은 capability 태그 집합을 선언하고 `execute`를 구현합니다.
//! Orchestrator는 구체 타입이 아닌 태그로 agent를 고릅니다.

use crate::finding::Finding;
use crate::registry::AgentStatus;
use crate::task::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redwhisper_foundation::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Security testing agent - implement to add a new capability
#[async_trait]
pub trait SecurityAgent: Send + Sync {
    /// Stable identifier (registry key)
    fn id(&self) -> &str;

    /// Display name
    fn name(&self) -> &str;

    /// Capability tags this agent can serve
    fn capabilities(&self) -> &BTreeSet<String>;

    /// Run the task. Errors are converted into a failed task by the
    /// coordinator; they never reach the caller.
    async fn execute(&self, task: &Task) -> Result<AgentOutput>;

    /// Liveness reported on every heartbeat
    async fn health(&self) -> AgentStatus {
        AgentStatus::Idle
    }
}

/// Status reported by the agent alongside its findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed { reason: String },
}

/// Kind of provider insight gathered during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Guidance,
    Analysis,
    NextSteps,
}

/// Text returned by the insight provider (or the error it raised)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Insight {
    pub fn from_result(kind: InsightKind, result: Result<String>) -> Self {
        let (content, error) = match result {
            Ok(text) => (Some(text), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            kind,
            content,
            error,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of one payload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The attempt produced a finding
    Detected,
    /// The target did not appear vulnerable
    Clean,
    /// The attempt itself failed; remaining attempts still ran
    Errored { message: String },
}

/// Record of one payload attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub stage: String,
    pub payload: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn new(stage: impl Into<String>, payload: impl Into<String>, outcome: AttemptOutcome) -> Self {
        Self {
            stage: stage.into(),
            payload: payload.into(),
            outcome,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Errored { .. })
    }
}

/// Everything an agent hands back for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    #[serde(flatten)]
    pub status: RunStatus,
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
    pub finished_at: DateTime<Utc>,
}

impl AgentOutput {
    /// Create a completed output
    pub fn completed(findings: Vec<Finding>) -> Self {
        Self {
            status: RunStatus::Completed,
            findings,
            insights: Vec::new(),
            attempts: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    /// Create a failed output
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed {
                reason: reason.into(),
            },
            findings: Vec::new(),
            insights: Vec::new(),
            attempts: Vec::new(),
            finished_at: Utc::now(),
        }
    }

    pub fn with_insight(mut self, insight: Insight) -> Self {
        self.insights.push(insight);
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<AttemptRecord>) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// Number of attempts that errored
    pub fn errored_attempts(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redwhisper_foundation::Error;

    #[test]
    fn test_insight_from_error() {
        let insight = Insight::from_result(
            InsightKind::Analysis,
            Err(Error::ExternalCall("rate limited".into())),
        );
        assert!(insight.content.is_none());
        assert!(insight.error.unwrap().contains("rate limited"));
    }

    #[test]
    fn test_output_serialization_shape() {
        let output = AgentOutput::completed(vec![Finding::new("x", "high", "d")]).with_attempts(
            vec![
                AttemptRecord::new("reflected", "<svg onload=alert(1)>", AttemptOutcome::Detected),
                AttemptRecord::new(
                    "reflected",
                    "<img src=x>",
                    AttemptOutcome::Errored {
                        message: "timeout".into(),
                    },
                ),
            ],
        );

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["attempts"][0]["outcome"], "detected");
        assert_eq!(json["attempts"][1]["message"], "timeout");
        assert_eq!(output.errored_attempts(), 1);
    }

    #[test]
    fn test_failed_output() {
        let output = AgentOutput::failed("target unreachable");
        assert!(!output.is_completed());
        assert!(output.findings.is_empty());
    }
}
