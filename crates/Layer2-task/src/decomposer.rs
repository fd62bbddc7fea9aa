//! Task Decomposer
//!
//! `comprehensive` task를 요청된 테스트 타입별 subtask로 분해합니다.

use crate::task::{Task, TaskKind};
use redwhisper_foundation::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// Parameter key holding the requested test types
pub const TESTS_PARAM: &str = "tests";

pub struct TaskDecomposer;

impl TaskDecomposer {
    /// Requested test types, validated and de-duplicated (first occurrence kept)
    pub fn requested_types(task: &Task) -> Result<Vec<TaskKind>> {
        let entries = match task.parameters.get(TESTS_PARAM) {
            Some(Value::Array(entries)) => entries.as_slice(),
            Some(other) => {
                return Err(Error::Validation(format!(
                    "Parameter '{}' must be a list of test types, got {}",
                    TESTS_PARAM, other
                )))
            }
            None => &[],
        };

        if entries.is_empty() {
            return Err(Error::Validation(format!(
                "Comprehensive task requires a non-empty '{}' list",
                TESTS_PARAM
            )));
        }

        let mut kinds = Vec::with_capacity(entries.len());
        for entry in entries {
            let tag = entry.as_str().ok_or_else(|| {
                Error::Validation(format!("Test type must be a string, got {}", entry))
            })?;
            let kind: TaskKind = tag.parse()?;
            if kind.is_composite() {
                return Err(Error::Validation(format!(
                    "Test type '{}' cannot be nested in a comprehensive task",
                    tag
                )));
            }
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        Ok(kinds)
    }

    /// Create the subtasks and append their ids to the parent. Non-composite
    /// tasks pass through with no subtasks. The parent is untouched on error.
    pub fn decompose(parent: &mut Task) -> Result<Vec<Task>> {
        if !parent.is_composite() {
            return Ok(Vec::new());
        }

        let kinds = Self::requested_types(parent)?;
        let subtasks: Vec<Task> = kinds
            .into_iter()
            .map(|kind| Task::subtask_of(parent, kind))
            .collect();

        for subtask in &subtasks {
            parent.push_subtask(subtask.id);
        }

        debug!(
            task_id = %parent.id,
            subtasks = subtasks.len(),
            "Decomposed comprehensive task"
        );
        Ok(subtasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TaskStatus;
    use serde_json::{json, Map};

    fn comprehensive(tests: Value) -> Task {
        let mut params = Map::new();
        params.insert(TESTS_PARAM.into(), tests);
        params.insert("session".into(), json!("abc"));
        Task::new(TaskKind::Comprehensive, "http://dvwa/", params)
    }

    #[test]
    fn test_two_subtasks() {
        let mut parent = comprehensive(json!(["sql_injection", "xss"]));
        let subtasks = TaskDecomposer::decompose(&mut parent).unwrap();

        assert_eq!(subtasks.len(), 2);
        assert_eq!(subtasks[0].kind, TaskKind::SqlInjection);
        assert_eq!(subtasks[1].kind, TaskKind::Xss);
        for sub in &subtasks {
            assert_eq!(sub.target, parent.target);
            assert_eq!(sub.parameters, parent.parameters);
            assert_eq!(sub.status(), TaskStatus::Created);
            assert_eq!(sub.parent, Some(parent.id));
        }
        assert_eq!(
            parent.subtasks(),
            &[subtasks[0].id, subtasks[1].id]
        );
    }

    #[test]
    fn test_leaf_passes_through() {
        let mut task = Task::new(TaskKind::Xss, "http://t", Map::new());
        assert!(TaskDecomposer::decompose(&mut task).unwrap().is_empty());
        assert!(task.subtasks().is_empty());
    }

    #[test]
    fn test_empty_or_missing_list() {
        let mut empty = comprehensive(json!([]));
        assert!(matches!(TaskDecomposer::decompose(&mut empty), Err(Error::Validation(_))));

        let mut missing = Task::new(TaskKind::Comprehensive, "http://t", Map::new());
        assert!(matches!(TaskDecomposer::decompose(&mut missing), Err(Error::Validation(_))));
    }

    #[test]
    fn test_unknown_type_leaves_parent_untouched() {
        let mut parent = comprehensive(json!(["xss", "csrf"]));
        assert!(matches!(TaskDecomposer::decompose(&mut parent), Err(Error::Validation(_))));
        assert!(parent.subtasks().is_empty());
    }

    #[test]
    fn test_nested_comprehensive_rejected() {
        let mut parent = comprehensive(json!(["comprehensive"]));
        assert!(matches!(TaskDecomposer::decompose(&mut parent), Err(Error::Validation(_))));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let mut parent = comprehensive(json!(["xss", "sql_injection", "xss"]));
        let subtasks = TaskDecomposer::decompose(&mut parent).unwrap();
        let kinds: Vec<_> = subtasks.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TaskKind::Xss, TaskKind::SqlInjection]);
    }
}
