//! Core Traits - 협력자 인터페이스 정의
//!
//! 코어는 두 가지 외부 능력에만 의존합니다.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Layer3-agent (SqlInjectionAgent, XssAgent)  │
//! │        │                     │               │
//! │        ▼                     ▼               │
//! │  ProbeTransport        InsightProvider       │
//! │  (payload 전달)         (AI 분석, opaque)      │
//! ├──────────────────────────────────────────────┤
//! │  Layer2-provider (HttpProbe, OpenAi...)      │
//! └──────────────────────────────────────────────┘
//! ```

use super::types::{InsightRequest, ProbeRequest, ProbeResponse};
use crate::Result;
use async_trait::async_trait;

/// AI insight provider - `(context) -> text`
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Provider name (로그용)
    fn name(&self) -> &str;

    /// 분석 요청
    async fn insight(&self, request: &InsightRequest) -> Result<String>;
}

/// Delivers probe payloads to the target under test
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse>;
}
