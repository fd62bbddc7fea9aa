//! Payload-probe engine
//!
//! Guidance → 각 stage에서 baseline + 제안 payload 시도 → 사후 insight.
//! 시도마다 명시적인 결과가 남고, 실패한 시도가 나머지를 멈추지 않습니다.

use super::stage::{ProbeProfile, ProbeStage};
use crate::prompts;
use redwhisper_foundation::{InsightProvider, InsightRequest, ProbeResponse, ProbeTransport, Result};
use redwhisper_task::{
    AgentOutput, AttemptOutcome, AttemptRecord, Finding, Insight, InsightKind, Task,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Characters of the response body kept as evidence
pub const EVIDENCE_CHARS: usize = 200;

/// Stage name used for the payload suggestion step
pub const SUGGESTION_STAGE: &str = "suggestion";

#[derive(Clone)]
pub struct ProbeEngine {
    provider: Arc<dyn InsightProvider>,
    transport: Arc<dyn ProbeTransport>,
}

impl ProbeEngine {
    pub fn new(provider: Arc<dyn InsightProvider>, transport: Arc<dyn ProbeTransport>) -> Self {
        Self {
            provider,
            transport,
        }
    }

    /// Run a profile against the task target. Only a failed guidance call is
    /// an error; everything after it is recorded on the output.
    pub async fn run(
        &self,
        profile: &ProbeProfile,
        capabilities: &BTreeSet<String>,
        task: &Task,
    ) -> Result<AgentOutput> {
        let guidance = self
            .provider
            .insight(&prompts::guidance(capabilities, task))
            .await?;

        let mut attempts = Vec::new();
        let payloads = self.payloads(profile, &mut attempts).await;

        let mut findings = Vec::new();
        for stage in &profile.stages {
            let url = stage.url_for(&task.target);
            info!(task_id = %task.id, stage = stage.name, url = %url, payloads = payloads.len(), "Probing");

            for payload in &payloads {
                let (outcome, finding) = self.attempt(stage, &url, payload).await;
                if let AttemptOutcome::Errored { message } = &outcome {
                    warn!(task_id = %task.id, stage = stage.name, payload = %payload, error = %message, "Attempt failed");
                }
                findings.extend(finding);
                attempts.push(AttemptRecord::new(stage.name, payload.clone(), outcome));
            }
        }

        let errored = attempts.iter().filter(|a| a.is_error()).count();
        let analysis = self
            .provider
            .insight(&prompts::findings_analysis(capabilities, &findings))
            .await;
        let next_steps = self
            .provider
            .insight(&prompts::next_steps(capabilities, &findings, errored))
            .await;

        info!(
            task_id = %task.id,
            findings = findings.len(),
            attempts = attempts.len(),
            errored,
            "Probe run finished"
        );

        Ok(AgentOutput::completed(findings)
            .with_attempts(attempts)
            .with_insight(Insight::from_result(InsightKind::Guidance, Ok(guidance)))
            .with_insight(Insight::from_result(InsightKind::Analysis, analysis))
            .with_insight(Insight::from_result(InsightKind::NextSteps, next_steps)))
    }

    /// Baseline payloads followed by provider suggestions (one per non-empty
    /// line, duplicates dropped). A failed suggestion call is recorded and
    /// the baseline still runs.
    async fn payloads(&self, profile: &ProbeProfile, attempts: &mut Vec<AttemptRecord>) -> Vec<String> {
        let mut payloads: Vec<String> = profile.baseline.iter().map(|p| p.to_string()).collect();

        let (instruction, request) = profile.suggestion;
        match self
            .provider
            .insight(&InsightRequest::new(instruction, request))
            .await
        {
            Ok(text) => {
                let suggested: Vec<String> = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect();
                debug!(suggested = suggested.len(), "Provider suggested payloads");

                for payload in suggested.into_iter().take(profile.max_suggestions) {
                    if !payloads.contains(&payload) {
                        payloads.push(payload);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Payload suggestion failed; using baseline only");
                attempts.push(AttemptRecord::new(
                    SUGGESTION_STAGE,
                    "",
                    AttemptOutcome::Errored {
                        message: e.to_string(),
                    },
                ));
            }
        }

        payloads
    }

    async fn attempt(
        &self,
        stage: &ProbeStage,
        url: &str,
        payload: &str,
    ) -> (AttemptOutcome, Option<Finding>) {
        match self.try_attempt(stage, url, payload).await {
            Ok(Some(finding)) => (AttemptOutcome::Detected, Some(finding)),
            Ok(None) => (AttemptOutcome::Clean, None),
            Err(e) => (
                AttemptOutcome::Errored {
                    message: e.to_string(),
                },
                None,
            ),
        }
    }

    async fn try_attempt(&self, stage: &ProbeStage, url: &str, payload: &str) -> Result<Option<Finding>> {
        let mut last: Option<ProbeResponse> = None;
        for request in stage.delivery.requests(url, payload) {
            last = Some(self.transport.send(&request).await?);
        }
        let Some(response) = last else {
            return Ok(None);
        };

        let analysis = self
            .provider
            .insight(&prompts::response_analysis(
                stage.analysis_instruction,
                payload,
                &response,
            ))
            .await?;

        if !prompts::indicates_vulnerability(&analysis) {
            return Ok(None);
        }
        debug!(stage = stage.name, payload = %payload, "Vulnerability indicated");
        Ok(Some(stage.finding.build(
            payload,
            &analysis,
            response.excerpt(EVIDENCE_CHARS),
        )))
    }
}
