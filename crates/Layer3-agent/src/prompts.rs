//! Provider prompts shared by all agent variants

use redwhisper_foundation::{InsightRequest, ProbeResponse};
use redwhisper_task::{Finding, Task};
use std::collections::BTreeSet;

fn specialist(capabilities: &BTreeSet<String>) -> String {
    capabilities.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Before probing: how to run this test
pub fn guidance(capabilities: &BTreeSet<String>, task: &Task) -> InsightRequest {
    InsightRequest::new(
        format!(
            "You are a security testing agent specialized in {}. Provide guidance for executing this security test.",
            specialist(capabilities)
        ),
        format!(
            "Task: {}\nDescription: {}\nTarget: {}\nParameters: {}",
            task.kind,
            task.description,
            task.target,
            serde_json::Value::Object(task.parameters.clone())
        ),
    )
}

/// After each attempt: does the response show the vulnerability
pub fn response_analysis(instruction: &str, payload: &str, response: &ProbeResponse) -> InsightRequest {
    InsightRequest::new(
        instruction,
        format!(
            "Response content: {}\nStatus code: {}\nResponse time: {:.3}\nPayload used: {}",
            response.body,
            response.status,
            response.elapsed.as_secs_f64(),
            payload
        ),
    )
}

/// After probing: insights on the findings
pub fn findings_analysis(capabilities: &BTreeSet<String>, findings: &[Finding]) -> InsightRequest {
    InsightRequest::new(
        format!(
            "You are a security testing agent specialized in {}. Analyze the following vulnerability context and provide detailed insights.",
            specialist(capabilities)
        ),
        serde_json::to_string(findings).unwrap_or_default(),
    )
}

/// After probing: what to test next
pub fn next_steps(capabilities: &BTreeSet<String>, findings: &[Finding], errored: usize) -> InsightRequest {
    InsightRequest::new(
        format!(
            "You are a security testing agent specialized in {}. Based on the current findings, suggest the next testing steps.",
            specialist(capabilities)
        ),
        serde_json::json!({
            "findings": findings,
            "errored_attempts": errored,
        })
        .to_string(),
    )
}

/// The analysis text flags a hit
pub fn indicates_vulnerability(analysis: &str) -> bool {
    let lower = analysis.to_lowercase();
    lower.contains("vulnerability") || lower.contains("successful")
}
