//! Error types for RedWhisper
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// RedWhisper 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 요청 검증
    // ========================================================================
    /// Malformed task or request (unknown type, empty test list, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown task or agent id
    #[error("Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // 상태 머신 관련
    // ========================================================================
    /// Operation invoked on a task in the wrong state
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Assignment requested for a task that already left the pre-run states
    #[error("Task already assigned: {0}")]
    AlreadyAssigned(String),

    /// No idle agent advertises the required capability
    #[error("No capable agent for '{0}'")]
    NoCapableAgent(String),

    /// Report requested before the task reached a terminal state
    #[error("Not ready: {0}")]
    NotReady(String),

    // ========================================================================
    // 외부 호출 관련
    // ========================================================================
    /// The opaque agent / insight capability raised or returned garbage
    #[error("External call failed: {0}")]
    ExternalCall(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 설정 / 저장소
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Http(_) | Error::ExternalCall(_)
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::NotFound(_)
                | Error::Precondition(_)
                | Error::AlreadyAssigned(_)
                | Error::NoCapableAgent(_)
                | Error::NotReady(_)
        )
    }

    /// 외부 호출 에러 생성 헬퍼
    pub fn external(source: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::ExternalCall(format!("{}: {}", source.into(), message))
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
