//! Result Aggregator
//!
//! Finding들을 하나의 리포트로 병합합니다.
//! - 심각도별 카운트와 파생 위험도
//! - 우선순위 순으로 정렬된 remediation 목록 (stable)

use crate::finding::{Finding, Severity};
use crate::state::TaskStatus;
use crate::task::{Task, TaskId, TaskKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Severity counts / risk level
// ============================================================================

/// Findings per severity bucket (exact tag match)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    /// Unrecognized severities are not counted
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.bucket() {
                Some(Severity::Critical) => counts.critical += 1,
                Some(Severity::High) => counts.high += 1,
                Some(Severity::Medium) => counts.medium += 1,
                Some(Severity::Low) => counts.low += 1,
                None => {}
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Overall risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// First matching rule wins
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        if counts.critical > 0 || counts.high > 2 {
            Self::Critical
        } else if counts.high > 0 || counts.medium > 2 {
            Self::High
        } else if counts.medium > 0 || counts.low > 2 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// One remediation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub vulnerability: String,
    pub severity: String,
    pub description: String,
    pub remediation: String,
    /// critical 1 .. low 4, unknown 5
    pub priority: u8,
}

impl From<&Finding> for Recommendation {
    fn from(finding: &Finding) -> Self {
        Self {
            vulnerability: finding.name.clone(),
            severity: finding.severity.clone(),
            description: finding.description.clone(),
            remediation: finding.remediation_or_default().to_string(),
            priority: finding.priority(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub overview: String,
    pub target: String,
    pub total_findings: usize,
    pub risk_level: RiskLevel,
    pub severity_counts: SeverityCounts,
    pub assessment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    pub target: String,
    pub test_types: Vec<TaskKind>,
    /// Raw findings, unrecognized severities included
    pub findings: Vec<Finding>,
}

/// Merged view of all findings for a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub executive_summary: ExecutiveSummary,
    pub technical_details: TechnicalDetails,
    pub remediation_steps: Vec<Recommendation>,
}

impl AggregateReport {
    pub fn risk_level(&self) -> RiskLevel {
        self.executive_summary.risk_level
    }

    pub fn findings(&self) -> &[Finding] {
        &self.technical_details.findings
    }
}

/// What the report is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportScope {
    pub target: String,
    pub test_types: Vec<TaskKind>,
}

impl ReportScope {
    pub fn new(target: impl Into<String>, test_types: Vec<TaskKind>) -> Self {
        Self {
            target: target.into(),
            test_types,
        }
    }

    /// Leaf: its own type. Composite: the types of its subtasks.
    pub fn for_task(task: &Task, subtasks: &[Task]) -> Self {
        let test_types = if task.is_composite() {
            subtasks.iter().map(|s| s.kind).collect()
        } else {
            vec![task.kind]
        };
        Self::new(task.target.clone(), test_types)
    }
}

/// Per-subtask entry of a composite rollup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskResult {
    pub task_id: TaskId,
    pub task_type: TaskKind,
    pub status: TaskStatus,
    pub agent: Option<String>,
    pub findings: Vec<Finding>,
}

/// Stored on a composite task once every subtask completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResults {
    pub subtask_results: Vec<SubtaskResult>,
    pub report: AggregateReport,
}

// ============================================================================
// Aggregator
// ============================================================================

pub struct ResultAggregator;

impl ResultAggregator {
    /// Build the report for a set of findings
    pub fn aggregate(scope: &ReportScope, findings: &[Finding]) -> AggregateReport {
        let severity_counts = SeverityCounts::from_findings(findings);

        AggregateReport {
            executive_summary: ExecutiveSummary {
                overview: format!("Security assessment of {}", scope.target),
                target: scope.target.clone(),
                total_findings: findings.len(),
                risk_level: RiskLevel::from_counts(&severity_counts),
                severity_counts,
                assessment_date: Utc::now(),
            },
            technical_details: TechnicalDetails {
                target: scope.target.clone(),
                test_types: scope.test_types.clone(),
                findings: findings.to_vec(),
            },
            remediation_steps: Self::recommendations(findings),
        }
    }

    /// One entry per finding, stable-sorted by priority
    pub fn recommendations(findings: &[Finding]) -> Vec<Recommendation> {
        let mut steps: Vec<Recommendation> = findings.iter().map(Recommendation::from).collect();
        steps.sort_by_key(|r| r.priority);
        steps
    }

    /// Findings of the completed tasks, in the given order
    pub fn completed_findings(tasks: &[Task]) -> Vec<Finding> {
        tasks
            .iter()
            .filter(|t| t.status().is_success())
            .flat_map(|t| t.findings().iter().cloned())
            .collect()
    }

    /// Rollup payload for a composite task
    pub fn roll_up(parent: &Task, subtasks: &[Task]) -> AggregatedResults {
        let subtask_results = subtasks
            .iter()
            .map(|t| SubtaskResult {
                task_id: t.id,
                task_type: t.kind,
                status: t.status(),
                agent: t.assigned_agent().map(str::to_string),
                findings: t.findings().to_vec(),
            })
            .collect();

        let scope = ReportScope::for_task(parent, subtasks);
        let findings = Self::completed_findings(subtasks);

        AggregatedResults {
            subtask_results,
            report: Self::aggregate(&scope, &findings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(name: &str, severity: &str) -> Finding {
        Finding::new(name, severity, format!("{} found", name))
    }

    fn risk(severities: &[&str]) -> RiskLevel {
        let findings: Vec<_> = severities.iter().map(|s| finding("v", s)).collect();
        RiskLevel::from_counts(&SeverityCounts::from_findings(&findings))
    }

    #[test]
    fn test_risk_scenarios() {
        assert_eq!(risk(&["critical"]), RiskLevel::Critical);
        assert_eq!(risk(&["high", "high", "high"]), RiskLevel::Critical);
        assert_eq!(risk(&["high"]), RiskLevel::High);
        assert_eq!(risk(&["medium", "medium", "medium"]), RiskLevel::High);
        assert_eq!(risk(&["medium"]), RiskLevel::Medium);
        assert_eq!(risk(&["low", "low", "low"]), RiskLevel::Medium);
        assert_eq!(risk(&["low", "low"]), RiskLevel::Low);
        assert_eq!(risk(&[]), RiskLevel::Low);
    }

    #[test]
    fn test_unrecognized_severity_excluded_from_counts() {
        let findings = vec![finding("a", "Critical"), finding("b", "info"), finding("c", "low")];
        let counts = SeverityCounts::from_findings(&findings);
        assert_eq!(counts.critical, 0);
        assert_eq!(counts.low, 1);
        assert_eq!(counts.total(), 1);

        let report = ResultAggregator::aggregate(&ReportScope::new("t", vec![]), &findings);
        assert_eq!(report.executive_summary.total_findings, 3);
        assert_eq!(report.findings().len(), 3);
        assert_eq!(report.risk_level(), RiskLevel::Low);
    }

    #[test]
    fn test_recommendations_stable_by_priority() {
        let findings = vec![
            finding("low-1", "low"),
            finding("high-1", "high"),
            finding("odd", "weird"),
            finding("high-2", "HIGH"),
            finding("crit", "critical"),
        ];
        let names: Vec<_> = ResultAggregator::recommendations(&findings)
            .into_iter()
            .map(|r| (r.vulnerability, r.priority))
            .collect();

        assert_eq!(
            names,
            vec![
                ("crit".to_string(), 1),
                ("high-1".to_string(), 2),
                ("high-2".to_string(), 2),
                ("low-1".to_string(), 4),
                ("odd".to_string(), 5),
            ]
        );
    }

    #[test]
    fn test_default_remediation() {
        let recs = ResultAggregator::recommendations(&[finding("x", "low")]);
        assert_eq!(recs[0].remediation, crate::finding::DEFAULT_REMEDIATION);
    }

    #[test]
    fn test_order_independent_counts() {
        let mut findings = vec![
            finding("a", "medium"),
            finding("b", "high"),
            finding("c", "low"),
            finding("d", "medium"),
        ];
        let scope = ReportScope::new("t", vec![TaskKind::Xss]);
        let forward = ResultAggregator::aggregate(&scope, &findings);
        findings.reverse();
        let backward = ResultAggregator::aggregate(&scope, &findings);

        assert_eq!(
            forward.executive_summary.severity_counts,
            backward.executive_summary.severity_counts
        );
        assert_eq!(forward.risk_level(), backward.risk_level());
    }

    #[test]
    fn test_report_shape() {
        let scope = ReportScope::new("http://dvwa/", vec![TaskKind::SqlInjection, TaskKind::Xss]);
        let report = ResultAggregator::aggregate(&scope, &[finding("SQLi", "high")]);

        assert_eq!(report.executive_summary.overview, "Security assessment of http://dvwa/");
        assert_eq!(report.executive_summary.target, "http://dvwa/");
        assert_eq!(report.technical_details.test_types.len(), 2);
        assert_eq!(report.remediation_steps.len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["executive_summary"]["risk_level"], "High");
        assert_eq!(json["technical_details"]["test_types"][0], "sql_injection");
    }
}
