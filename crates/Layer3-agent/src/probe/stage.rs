//! Probe profiles: what an agent sends and how a hit becomes a finding

use redwhisper_foundation::ProbeRequest;
use redwhisper_task::Finding;

/// How a payload reaches the target
#[derive(Debug, Clone)]
pub enum Delivery {
    /// GET with the payload in `field` plus fixed extra query fields
    Query {
        field: &'static str,
        extra: &'static [(&'static str, &'static str)],
    },
    /// POST a form carrying the payload, then GET the same URL to view it
    StoreThenView {
        field: &'static str,
        extra: &'static [(&'static str, &'static str)],
    },
}

impl Delivery {
    /// Requests for one attempt, in send order. The last response is analysed.
    pub fn requests(&self, url: &str, payload: &str) -> Vec<ProbeRequest> {
        match self {
            Delivery::Query { field, extra } => {
                let request = extra
                    .iter()
                    .fold(ProbeRequest::get(url).field(*field, payload), |req, (k, v)| {
                        req.field(*k, *v)
                    });
                vec![request]
            }
            Delivery::StoreThenView { field, extra } => {
                let store = extra
                    .iter()
                    .fold(ProbeRequest::post(url).field(*field, payload), |req, (k, v)| {
                        req.field(*k, *v)
                    });
                vec![store, ProbeRequest::get(url)]
            }
        }
    }
}

/// Finding emitted when the analysis flags an attempt
#[derive(Debug, Clone)]
pub struct FindingTemplate {
    pub name: &'static str,
    pub severity: &'static str,
    /// "... detected" sentence; the payload is appended
    pub detected: &'static str,
    pub remediation: &'static str,
}

impl FindingTemplate {
    pub fn build(&self, payload: &str, analysis: &str, evidence: String) -> Finding {
        Finding::new(
            self.name,
            self.severity,
            format!("{} with payload: {}", self.detected, payload),
        )
        .with_remediation(self.remediation)
        .with_evidence(evidence)
        .with_analysis(analysis)
    }
}

/// One probing pass over the payload list
#[derive(Debug, Clone)]
pub struct ProbeStage {
    pub name: &'static str,
    /// Substring of the task target replaced for this stage (`from`, `to`)
    pub rewrite: Option<(&'static str, &'static str)>,
    pub delivery: Delivery,
    /// Instruction for the per-attempt response analysis
    pub analysis_instruction: &'static str,
    pub finding: FindingTemplate,
}

impl ProbeStage {
    pub fn url_for(&self, target: &str) -> String {
        match self.rewrite {
            Some((from, to)) => target.replace(from, to),
            None => target.to_string(),
        }
    }
}

/// Everything that distinguishes one agent variant from another
#[derive(Debug, Clone)]
pub struct ProbeProfile {
    /// Known-effective payloads, always tried first
    pub baseline: &'static [&'static str],
    /// Provider prompt for extra payloads (instruction, request)
    pub suggestion: (&'static str, &'static str),
    pub max_suggestions: usize,
    pub stages: Vec<ProbeStage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use redwhisper_foundation::ProbeMethod;

    #[test]
    fn test_query_delivery() {
        let delivery = Delivery::Query {
            field: "id",
            extra: &[("Submit", "Submit")],
        };
        let requests = delivery.requests("http://t/sqli/", "1' OR '1'='1");

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, ProbeMethod::Get);
        assert_eq!(requests[0].field_value("id"), Some("1' OR '1'='1"));
        assert_eq!(requests[0].field_value("Submit"), Some("Submit"));
    }

    #[test]
    fn test_store_then_view() {
        let delivery = Delivery::StoreThenView {
            field: "txtName",
            extra: &[("mtxMessage", "XSS Test")],
        };
        let requests = delivery.requests("http://t/xss_s/", "<svg onload=alert(1)>");

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, ProbeMethod::Post);
        assert_eq!(requests[0].field_value("mtxMessage"), Some("XSS Test"));
        assert_eq!(requests[1].method, ProbeMethod::Get);
        assert!(requests[1].fields.is_empty());
    }

    #[test]
    fn test_finding_template() {
        let template = FindingTemplate {
            name: "SQL Injection Vulnerability",
            severity: "high",
            detected: "SQL injection vulnerability detected",
            remediation: "Use parameterized queries",
        };
        let finding = template.build("1'", "looks successful", "<html>".to_string());

        assert_eq!(finding.description, "SQL injection vulnerability detected with payload: 1'");
        assert_eq!(finding.evidence, "<html>");
        assert_eq!(finding.analysis.as_deref(), Some("looks successful"));
    }
}
