//! Non-interactive commands

use anyhow::{bail, Context};
use redwhisper_agent::{builtin_agents, BUILTIN_AGENTS};
use redwhisper_foundation::AppConfig;
use redwhisper_provider::{HttpProbe, OpenAiInsightProvider};
use redwhisper_task::{Orchestrator, TaskRequest, TESTS_PARAM};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Print the built-in agents
pub fn list_agents() {
    println!("{:<14} {:<22} {}", "ID", "Name", "Capabilities");
    println!("{}", "-".repeat(60));
    for (id, name, capabilities) in BUILTIN_AGENTS {
        println!("{:<14} {:<22} {}", id, name, capabilities.join(", "));
    }
}

/// Assemble a task request from command-line arguments
pub fn build_request(
    task_type: &str,
    target: &str,
    tests: &[String],
    params: &[String],
    priority: Option<i32>,
) -> anyhow::Result<TaskRequest> {
    let mut request = TaskRequest::new(task_type, target);

    for param in params {
        let Some((key, raw)) = param.split_once('=') else {
            bail!("Invalid parameter '{}': expected key=value", param);
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        request = request.with_parameter(key.trim(), value);
    }

    if !tests.is_empty() {
        let tests = tests
            .iter()
            .map(|t| Value::String(t.trim().to_string()))
            .collect();
        request = request.with_parameter(TESTS_PARAM, Value::Array(tests));
    }

    if let Some(priority) = priority {
        request = request.with_priority(priority);
    }
    Ok(request)
}

/// Run one task end to end and print its report as JSON
pub async fn run_once(config: &AppConfig, request: TaskRequest, save: bool) -> anyhow::Result<()> {
    let provider = OpenAiInsightProvider::from_settings(&config.provider)
        .context("Insight provider is not configured")?;
    let transport = HttpProbe::new(&config.probe)?;

    let orchestrator = Orchestrator::new(config.orchestrator.clone());
    for agent in builtin_agents(Arc::new(provider), Arc::new(transport)) {
        orchestrator.register_agent(agent).await;
    }
    orchestrator.start_heartbeats();

    let task_id = orchestrator.create_task_with(request).await?;
    info!(task_id = %task_id, "Task created");

    let result = orchestrator.execute_task(&task_id).await?;
    orchestrator.stop_heartbeats();

    if let Some(error) = &result.error {
        warn!(task_id = %task_id, status = %result.status, error = %error, "Task did not complete");
    }

    match orchestrator.get_report(&task_id).await {
        Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            warn!(error = %e, "No report available");
        }
    }

    if save {
        let location = orchestrator.save_report(&task_id).await?;
        eprintln!("Report saved: {}", location);
    }

    if !result.is_success() {
        bail!("Task {} {}", task_id, result.status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_parses_params() {
        let params = vec!["depth=3".to_string(), "mode=fast".to_string()];
        let tests = vec!["sql_injection".to_string(), " xss".to_string()];
        let request = build_request("comprehensive", "http://t", &tests, &params, Some(2)).unwrap();

        assert_eq!(request.parameters["depth"], Value::from(3));
        assert_eq!(request.parameters["mode"], Value::from("fast"));
        assert_eq!(
            request.parameters[TESTS_PARAM],
            serde_json::json!(["sql_injection", "xss"])
        );
        assert_eq!(request.priority, 2);
    }

    #[test]
    fn test_build_request_rejects_bad_param() {
        let params = vec!["novalue".to_string()];
        assert!(build_request("xss", "http://t", &[], &params, None).is_err());
    }
}
