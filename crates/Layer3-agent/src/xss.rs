//! Cross-site scripting agent
//!
//! 두 stage가 하나의 payload 목록을 공유합니다:
//! reflected (대상 GET)와 stored (`xss_s` 방명록 POST 후 조회).

use crate::probe::{Delivery, FindingTemplate, ProbeEngine, ProbeProfile, ProbeStage};
use async_trait::async_trait;
use redwhisper_foundation::Result;
use redwhisper_task::{AgentOutput, SecurityAgent, Task};
use std::collections::BTreeSet;
use tracing::info;

pub const XSS_AGENT_ID: &str = "xss-agent-1";
pub const XSS_AGENT_NAME: &str = "XSS Agent";
pub const XSS_CAPABILITIES: &[&str] = &["xss", "web_security"];

const BASELINE: &[&str] = &[
    "<script>alert(1)</script>",
    "<img src=x onerror=alert(1)>",
    "<svg onload=alert(1)>",
];

pub struct XssAgent {
    id: String,
    capabilities: BTreeSet<String>,
    profile: ProbeProfile,
    engine: ProbeEngine,
}

impl XssAgent {
    pub fn new(engine: ProbeEngine) -> Self {
        Self::with_id(XSS_AGENT_ID, engine)
    }

    pub fn with_id(id: impl Into<String>, engine: ProbeEngine) -> Self {
        Self {
            id: id.into(),
            capabilities: XSS_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            profile: Self::profile(),
            engine,
        }
    }

    pub fn profile() -> ProbeProfile {
        ProbeProfile {
            baseline: BASELINE,
            suggestion: (
                "You are a security expert. Generate a list of XSS payloads for testing.",
                "Generate 5 XSS payloads for testing web forms.",
            ),
            max_suggestions: 5,
            stages: vec![
                ProbeStage {
                    name: "reflected_xss",
                    rewrite: None,
                    delivery: Delivery::Query {
                        field: "name",
                        extra: &[("Submit", "Submit")],
                    },
                    analysis_instruction: "You are a security expert. Analyze this response for signs of XSS vulnerability.",
                    finding: FindingTemplate {
                        name: "Reflected XSS Vulnerability",
                        severity: "high",
                        detected: "Reflected XSS vulnerability detected",
                        remediation: "Implement proper input validation and output encoding",
                    },
                },
                ProbeStage {
                    name: "stored_xss",
                    rewrite: Some(("vulnerabilities/xss_r/", "vulnerabilities/xss_s/")),
                    delivery: Delivery::StoreThenView {
                        field: "txtName",
                        extra: &[("mtxMessage", "XSS Test"), ("btnSign", "Sign Guestbook")],
                    },
                    analysis_instruction: "You are a security expert. Analyze this response for signs of stored XSS vulnerability.",
                    finding: FindingTemplate {
                        name: "Stored XSS Vulnerability",
                        severity: "critical",
                        detected: "Stored XSS vulnerability detected",
                        remediation: "Implement proper input validation, output encoding, and content security policy",
                    },
                },
            ],
        }
    }
}

#[async_trait]
impl SecurityAgent for XssAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        XSS_AGENT_NAME
    }

    fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    async fn execute(&self, task: &Task) -> Result<AgentOutput> {
        info!(agent = %self.id, task_id = %task.id, target = %task.target, "Starting XSS test");
        self.engine.run(&self.profile, &self.capabilities, task).await
    }
}
