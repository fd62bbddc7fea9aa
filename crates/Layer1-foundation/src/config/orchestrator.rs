//! Orchestrator configuration
//!
//! 주기, 임계값, 리포트 디렉토리 등의 실행 파라미터를 하나의 구조체로 모아
//! 생성 시점에 Orchestrator로 전달합니다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Task types accepted by `CreateTask`, in canonical order.
pub const RECOGNIZED_TASK_TYPES: &[&str] = &["sql_injection", "xss", "phishing", "comprehensive"];

/// Orchestration core settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Upper bound on a single agent execution (seconds).
    /// Expiry counts as a failed outcome.
    pub execution_timeout_secs: u64,

    /// Period of each agent's heartbeat loop (seconds)
    pub heartbeat_interval_secs: u64,

    /// Agents silent for longer than this are marked `error` (seconds)
    pub heartbeat_timeout_secs: u64,

    /// Subtasks of one composite task driven concurrently
    pub max_concurrent_subtasks: usize,

    /// Directory used by the JSON report sink
    pub report_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            execution_timeout_secs: 300,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_concurrent_subtasks: 5,
            report_dir: PathBuf::from("reports"),
        }
    }
}

impl OrchestratorConfig {
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// The fixed set of recognized task types
    pub fn recognized_types(&self) -> &'static [&'static str] {
        RECOGNIZED_TASK_TYPES
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    pub fn with_max_concurrent_subtasks(mut self, max: usize) -> Self {
        self.max_concurrent_subtasks = max.max(1);
        self
    }
}
