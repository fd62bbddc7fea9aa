//! Task state machine
//!
//! ```text
//! created ──assign──▶ assigned ──start──▶ in_progress ──complete──▶ completed
//!    │                   │                    │
//!    └───────────────────┴────────fail────────┴──────────────────▶ failed
//! ```
//!
//! Composite tasks never run on an agent; they leave the pre-run states
//! only through the subtask rollup.

use redwhisper_foundation::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Possible states of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task exists but has no agent yet ("pending" is accepted as an alias)
    #[serde(alias = "pending")]
    Created,

    /// An idle agent has been reserved for the task
    Assigned,

    /// The agent is executing the task
    InProgress,

    /// Task completed successfully
    Completed,

    /// Task failed with an error
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Created,
        TaskStatus::Assigned,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// `created` and `assigned` are equivalent pre-run states
    pub fn is_pre_run(&self) -> bool {
        matches!(self, TaskStatus::Created | TaskStatus::Assigned)
    }

    /// Check if task is currently running
    pub fn is_running(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    /// Check if task completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Whether `self -> next` is an edge of the agent-driven state machine
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Created, Assigned)
                | (Assigned, InProgress)
                | (InProgress, Completed)
                | (Created, Failed)
                | (Assigned, Failed)
                | (InProgress, Failed)
        )
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" | "pending" => Ok(TaskStatus::Created),
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(Error::Validation(format!("Unknown task status '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_declared_edges_are_reachable() {
        use TaskStatus::*;
        let allowed = [
            (Created, Assigned),
            (Assigned, InProgress),
            (InProgress, Completed),
            (Created, Failed),
            (Assigned, Failed),
            (InProgress, Failed),
        ];

        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for to in TaskStatus::ALL {
            assert!(!TaskStatus::Completed.can_transition_to(to));
            assert!(!TaskStatus::Failed.can_transition_to(to));
        }
    }

    #[test]
    fn test_pending_alias() {
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Created);
        let parsed: TaskStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(parsed, TaskStatus::Created);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"created\"");
    }

    #[test]
    fn test_unknown_status_is_validation_error() {
        assert!(matches!(
            "paused".parse::<TaskStatus>(),
            Err(Error::Validation(_))
        ));
    }
}
