//! OpenAI-compatible insight provider (chat completions)

use crate::error::ProviderError;
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use redwhisper_foundation::{Error, InsightProvider, InsightRequest, ProviderSettings, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Insight provider backed by an OpenAI-compatible chat completions API
pub struct OpenAiInsightProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryConfig,
}

impl OpenAiInsightProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_API_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Build from settings; the API key is read from `settings.api_key_env`
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
            Error::from(ProviderError::NotConfigured(format!(
                "{} environment variable is not set",
                settings.api_key_env
            )))
        })?;

        Ok(Self::new(api_key, settings.model.clone())?
            .with_base_url(settings.base_url.clone())
            .with_timeout(Duration::from_secs(settings.timeout_secs))?
            .with_retry(RetryConfig::new(settings.max_retries)))
    }

    /// Custom endpoint (Azure, LocalAI, ...)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request<'a>(&'a self, request: &'a InsightRequest) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.context,
                },
            ],
        }
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> std::result::Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;

        if !status.is_success() {
            return Err(parse_error_response(status.as_u16(), &text));
        }
        parse_completion(&text)
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Content of the first choice
fn parse_completion(body: &str) -> std::result::Result<String, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))
}

fn parse_error_response(status: u16, body: &str) -> ProviderError {
    if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
        let message = error_response.error.message;
        return match error_response.error.code.as_deref() {
            Some("rate_limit_exceeded") => ProviderError::RateLimited {
                retry_after_ms: None,
            },
            Some("invalid_api_key") => ProviderError::Authentication(message),
            Some("insufficient_quota") => ProviderError::QuotaExceeded(message),
            Some("model_not_found") => ProviderError::ModelNotAvailable(message),
            _ => ProviderError::from_http_status(status, &message),
        };
    }
    ProviderError::from_http_status(status, body)
}

#[async_trait]
impl InsightProvider for OpenAiInsightProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn insight(&self, request: &InsightRequest) -> Result<String> {
        let body = self.build_request(request);
        debug!(model = %self.model, context_len = request.context.len(), "Requesting insight");

        let body = &body;
        with_retry(&self.retry, "openai.insight", move || self.send_once(body))
            .await
            .map_err(Error::from)
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}
