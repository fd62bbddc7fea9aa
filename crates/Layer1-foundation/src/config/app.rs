//! App Config - 통합 설정
//!
//! global (`<config_dir>/redwhisper/redwhisper.json`) 위에
//! project (`./.redwhisper/redwhisper.json`) 를 병합합니다.

use super::OrchestratorConfig;
use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// 설정 파일명
pub const CONFIG_FILE: &str = "redwhisper.json";

// ============================================================================
// App Config (통합)
// ============================================================================

/// RedWhisper 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// 오케스트레이터 설정
    pub orchestrator: OrchestratorConfig,

    /// Insight provider 설정
    pub provider: ProviderSettings,

    /// Probe transport 설정
    pub probe: ProbeSettings,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드 (프로젝트 우선)
    pub fn load() -> Result<Self> {
        let mut merged = Value::Object(Default::default());

        if let Ok(global) = JsonStore::global() {
            if let Some(value) = global.load_optional::<Value>(CONFIG_FILE)? {
                debug!("Loaded global config from {}", global.base_dir().display());
                merge_json(&mut merged, value);
            }
        }

        if let Ok(project) = JsonStore::current_project() {
            if let Some(value) = project.load_optional::<Value>(CONFIG_FILE)? {
                debug!("Loaded project config from {}", project.base_dir().display());
                merge_json(&mut merged, value);
            }
        }

        Self::from_value(merged)
    }

    /// 명시적 경로에서 로드 (global/project 무시)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }
}

/// 객체는 재귀 병합, 나머지는 overlay 가 덮어씀
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                merge_json(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

// ============================================================================
// Provider Settings
// ============================================================================

/// OpenAI 호환 insight provider 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// Chat completions endpoint
    pub base_url: String,

    /// 모델 이름
    pub model: String,

    /// API 키를 읽을 환경 변수 이름
    pub api_key_env: String,

    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,

    /// 일시적 실패 시 재시도 횟수
    pub max_retries: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

// ============================================================================
// Probe Settings
// ============================================================================

/// HTTP probe transport 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeSettings {
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,

    /// 테스트 대상의 자체 서명 인증서 허용
    pub accept_invalid_certs: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            accept_invalid_certs: true,
        }
    }
}
