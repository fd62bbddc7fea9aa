//! Core Types - 협력자 호출에 쓰이는 데이터 타입

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Insight
// ============================================================================

/// Request handed to an insight provider
///
/// `instruction` frames the role of the analyst, `context` carries the
/// material to analyse. The wire format is left to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightRequest {
    pub instruction: String,
    pub context: String,
}

impl InsightRequest {
    pub fn new(instruction: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            context: context.into(),
        }
    }
}

// ============================================================================
// Probe
// ============================================================================

/// HTTP method used by a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    /// Fields are sent as query parameters
    Get,
    /// Fields are sent as a urlencoded form body
    Post,
}

/// One request delivered to the target under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    pub method: ProbeMethod,
    pub url: String,
    pub fields: Vec<(String, String)>,
}

impl ProbeRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: ProbeMethod::Get,
            url: url.into(),
            fields: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: ProbeMethod::Post,
            url: url.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Value of the first field with `name`
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Snapshot of the target's answer to a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl ProbeResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// First `max_chars` characters of the body (char-boundary safe)
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.body.chars().take(max_chars).collect()
    }
}
