//! Report persistence
//!
//! 저장할 때마다 JSON 객체 하나: `{test_type}_report_{timestamp}.json`

use crate::aggregator::SeverityCounts;
use crate::finding::Finding;
use chrono::{DateTime, Utc};
use redwhisper_foundation::{JsonStore, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Summary block of a persisted report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_findings: usize,
    pub risk_levels: SeverityCounts,
}

/// Persisted report layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedReport {
    pub test_type: String,
    pub timestamp: DateTime<Utc>,
    pub findings: Vec<Finding>,
    pub summary: ReportSummary,
}

impl FormattedReport {
    pub fn new(test_type: impl Into<String>, findings: Vec<Finding>) -> Self {
        let summary = ReportSummary {
            total_findings: findings.len(),
            risk_levels: SeverityCounts::from_findings(&findings),
        };
        Self {
            test_type: test_type.into(),
            timestamp: Utc::now(),
            findings,
            summary,
        }
    }

    /// `{test_type}_report_{YYYYmmdd_HHMMSS}.json`
    pub fn file_name(&self) -> String {
        format!(
            "{}_report_{}.json",
            self.test_type,
            self.timestamp.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Accepts a formatted report and returns where it was stored
pub trait ReportSink: Send + Sync {
    fn store(&self, report: &FormattedReport) -> Result<String>;
}

/// Writes reports as JSON files under one directory
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    store: JsonStore,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: JsonStore::new(dir),
        }
    }

    pub fn dir(&self) -> &std::path::Path {
        self.store.base_dir()
    }
}

impl ReportSink for JsonReportSink {
    fn store(&self, report: &FormattedReport) -> Result<String> {
        let path = self.store.save(&report.file_name(), report)?;
        info!(path = %path.display(), findings = report.summary.total_findings, "Report saved");
        Ok(path.display().to_string())
    }
}
