//! Finding - agent가 보고하는 취약점

use serde::{Deserialize, Serialize};

/// Remediation text used when a finding carries none
pub const DEFAULT_REMEDIATION: &str = "No specific remediation steps provided.";

/// Priority assigned to severities outside the known buckets
pub const UNKNOWN_PRIORITY: u8 = 5;

/// Known severity buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Exact tag match, used for bucket counts
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Remediation priority (1 = most urgent)
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Critical => 1,
            Severity::High => 2,
            Severity::Medium => 3,
            Severity::Low => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reported vulnerability. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Vulnerability name
    pub name: String,

    /// Severity tag; kept verbatim so unknown tags survive aggregation
    pub severity: String,

    pub description: String,

    #[serde(default)]
    pub remediation: String,

    /// Response excerpt backing the finding
    #[serde(default)]
    pub evidence: String,

    /// Provider analysis that flagged the finding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

impl Finding {
    pub fn new(
        name: impl Into<String>,
        severity: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            severity: severity.into(),
            description: description.into(),
            remediation: String::new(),
            evidence: String::new(),
            analysis: None,
        }
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = evidence.into();
        self
    }

    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.analysis = Some(analysis.into());
        self
    }

    /// Bucket of this finding, `None` for unrecognized tags
    pub fn bucket(&self) -> Option<Severity> {
        Severity::from_tag(&self.severity)
    }

    /// Remediation priority; the severity tag is matched case-insensitively here
    pub fn priority(&self) -> u8 {
        Severity::from_tag(&self.severity.to_lowercase())
            .map(|s| s.priority())
            .unwrap_or(UNKNOWN_PRIORITY)
    }

    /// Remediation text, falling back to the default wording
    pub fn remediation_or_default(&self) -> &str {
        if self.remediation.trim().is_empty() {
            DEFAULT_REMEDIATION
        } else {
            &self.remediation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_exact_match() {
        assert_eq!(Finding::new("a", "high", "").bucket(), Some(Severity::High));
        assert_eq!(Finding::new("a", "High", "").bucket(), None);
        assert_eq!(Finding::new("a", "info", "").bucket(), None);
    }

    #[test]
    fn test_priority_mapping() {
        assert_eq!(Finding::new("a", "critical", "").priority(), 1);
        assert_eq!(Finding::new("a", "HIGH", "").priority(), 2);
        assert_eq!(Finding::new("a", "medium", "").priority(), 3);
        assert_eq!(Finding::new("a", "low", "").priority(), 4);
        assert_eq!(Finding::new("a", "informational", "").priority(), UNKNOWN_PRIORITY);
    }

    #[test]
    fn test_default_remediation() {
        let bare = Finding::new("SQL Injection Vulnerability", "high", "");
        assert_eq!(bare.remediation_or_default(), DEFAULT_REMEDIATION);

        let fixed = bare.with_remediation("Use parameterized queries");
        assert_eq!(fixed.remediation_or_default(), "Use parameterized queries");
    }

    #[test]
    fn test_analysis_omitted_when_absent() {
        let json = serde_json::to_value(Finding::new("x", "low", "d")).unwrap();
        assert!(json.get("analysis").is_none());
        assert_eq!(json["severity"], "low");
    }
}
