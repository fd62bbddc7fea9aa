//! Config - 통합 설정 관리
//!
//! - `orchestrator.rs` - 오케스트레이터 실행 파라미터
//! - `app.rs` - AppConfig 통합 설정 (global + project 병합)

mod app;
mod orchestrator;

pub use app::{AppConfig, ProbeSettings, ProviderSettings, CONFIG_FILE};
pub use orchestrator::{OrchestratorConfig, RECOGNIZED_TASK_TYPES};
