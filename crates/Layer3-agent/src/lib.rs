//! # redwhisper-agent
//!
//! Built-in security agents for RedWhisper.
//!
//! 모든 Agent는 같은 payload-probe 엔진을 공유하고, 서로 다른 `ProbeProfile`
//! (baseline payload, 요청 형태, finding 템플릿)만 가진다.
//!
//! - **SqlInjectionAgent**: `sql_injection`, `web_security`
//! - **XssAgent**: `xss`, `web_security` (reflected + stored)
//!
//! ## 사용 예
//!
//! ```ignore
//! use redwhisper_agent::builtin_agents;
//!
//! for agent in builtin_agents(provider, transport) {
//!     orchestrator.register_agent(agent).await;
//! }
//! ```

pub mod probe;
pub mod prompts;
pub mod sql_injection;
pub mod xss;

pub use probe::{Delivery, FindingTemplate, ProbeEngine, ProbeProfile, ProbeStage};
pub use sql_injection::{SqlInjectionAgent, SQL_AGENT_ID, SQL_AGENT_NAME, SQL_CAPABILITIES};
pub use xss::{XssAgent, XSS_AGENT_ID, XSS_AGENT_NAME, XSS_CAPABILITIES};

use redwhisper_foundation::{InsightProvider, ProbeTransport};
use redwhisper_task::SecurityAgent;
use std::sync::Arc;

/// (id, name, capabilities) of every built-in agent
pub const BUILTIN_AGENTS: &[(&str, &str, &[&str])] = &[
    (SQL_AGENT_ID, SQL_AGENT_NAME, SQL_CAPABILITIES),
    (XSS_AGENT_ID, XSS_AGENT_NAME, XSS_CAPABILITIES),
];

/// One instance of every built-in agent, sharing a provider and transport
pub fn builtin_agents(
    provider: Arc<dyn InsightProvider>,
    transport: Arc<dyn ProbeTransport>,
) -> Vec<Arc<dyn SecurityAgent>> {
    let engine = ProbeEngine::new(provider, transport);
    vec![
        Arc::new(SqlInjectionAgent::new(engine.clone())),
        Arc::new(XssAgent::new(engine)),
    ]
}
