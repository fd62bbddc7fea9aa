//! # redwhisper-foundation
//!
//! Foundation layer for RedWhisper:
//! - Error: 에러 분류 (Validation, NotFound, Precondition, ...)
//! - Config: 통합 설정 (AppConfig, OrchestratorConfig)
//! - Storage: JsonStore (설정, 리포트)
//! - Core: 외부 협력자 계약 (InsightProvider, ProbeTransport)

pub mod config;
pub mod core;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (협력자 Trait 및 타입)
// ============================================================================
pub use core::{
    InsightProvider, InsightRequest, ProbeMethod, ProbeRequest, ProbeResponse, ProbeTransport,
};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    AppConfig, OrchestratorConfig, ProbeSettings, ProviderSettings, CONFIG_FILE,
    RECOGNIZED_TASK_TYPES,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
