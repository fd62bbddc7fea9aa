//! SQL injection agent

use crate::probe::{Delivery, FindingTemplate, ProbeEngine, ProbeProfile, ProbeStage};
use async_trait::async_trait;
use redwhisper_foundation::Result;
use redwhisper_task::{AgentOutput, SecurityAgent, Task};
use std::collections::BTreeSet;
use tracing::info;

pub const SQL_AGENT_ID: &str = "sql-agent-1";
pub const SQL_AGENT_NAME: &str = "SQL Injection Agent";
pub const SQL_CAPABILITIES: &[&str] = &["sql_injection", "web_security"];

const BASELINE: &[&str] = &[
    "1' OR '1'='1",
    "1' UNION SELECT user,password FROM users -- -",
    "1' AND SLEEP(5) -- -",
];

/// Probes the `id` query parameter with SQL injection payloads
pub struct SqlInjectionAgent {
    id: String,
    capabilities: BTreeSet<String>,
    profile: ProbeProfile,
    engine: ProbeEngine,
}

impl SqlInjectionAgent {
    pub fn new(engine: ProbeEngine) -> Self {
        Self::with_id(SQL_AGENT_ID, engine)
    }

    pub fn with_id(id: impl Into<String>, engine: ProbeEngine) -> Self {
        Self {
            id: id.into(),
            capabilities: SQL_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            profile: Self::profile(),
            engine,
        }
    }

    pub fn profile() -> ProbeProfile {
        ProbeProfile {
            baseline: BASELINE,
            suggestion: (
                "You are a security expert. Generate a list of SQL injection payloads for testing.",
                "Generate 5 SQL injection payloads for testing login forms.",
            ),
            max_suggestions: 5,
            stages: vec![ProbeStage {
                name: "sql_injection",
                rewrite: None,
                delivery: Delivery::Query {
                    field: "id",
                    extra: &[("Submit", "Submit")],
                },
                analysis_instruction: "You are a security expert. Analyze this response for signs of SQL injection vulnerability.",
                finding: FindingTemplate {
                    name: "SQL Injection Vulnerability",
                    severity: "high",
                    detected: "SQL injection vulnerability detected",
                    remediation: "Implement proper input validation and use parameterized queries",
                },
            }],
        }
    }
}

#[async_trait]
impl SecurityAgent for SqlInjectionAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        SQL_AGENT_NAME
    }

    fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    async fn execute(&self, task: &Task) -> Result<AgentOutput> {
        info!(agent = %self.id, task_id = %task.id, target = %task.target, "Starting SQL injection test");
        self.engine.run(&self.profile, &self.capabilities, task).await
    }
}
