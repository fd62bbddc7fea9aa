//! # redwhisper-task
//!
//! Task/agent orchestration core for RedWhisper.
//!
//! ## Features
//!
//! - Task lifecycle: `created -> assigned -> in_progress -> completed | failed`
//! - Capability 기반 agent 할당 (등록 순서상 첫 idle 매치)
//! - Composite ("comprehensive") task 분해 및 부모 rollup
//! - 위험도 산정과 우선순위 remediation을 포함한 결과 집계
//! - Agent별 독립 주기 heartbeat
//! - JSON 리포트 저장

pub mod agent;
pub mod aggregator;
pub mod assignment;
pub mod coordinator;
pub mod decomposer;
pub mod finding;
pub mod heartbeat;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod state;
pub mod store;
pub mod task;

// Task model
pub use finding::{Finding, Severity, DEFAULT_REMEDIATION};
pub use state::TaskStatus;
pub use task::{Task, TaskId, TaskKind, TaskRequest, TaskResult, DEFAULT_PRIORITY};

// Agents
pub use agent::{
    AgentOutput, AttemptOutcome, AttemptRecord, Insight, InsightKind, RunStatus, SecurityAgent,
};
pub use registry::{AgentDescriptor, AgentRegistry, AgentStatus};

// Orchestration
pub use assignment::AssignmentResolver;
pub use coordinator::{AgentPool, ExecutionCoordinator};
pub use decomposer::{TaskDecomposer, TESTS_PARAM};
pub use heartbeat::HeartbeatMonitor;
pub use orchestrator::Orchestrator;
pub use store::{TaskStats, TaskStore};

// Aggregation / reports
pub use aggregator::{
    AggregateReport, AggregatedResults, ExecutiveSummary, Recommendation, ReportScope,
    ResultAggregator, RiskLevel, SeverityCounts, SubtaskResult, TechnicalDetails,
};
pub use report::{FormattedReport, JsonReportSink, ReportSink, ReportSummary};
