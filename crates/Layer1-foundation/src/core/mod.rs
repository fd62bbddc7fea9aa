//! Core Module - 외부 협력자 인터페이스 및 타입
//!
//! 오케스트레이션 코어가 소비하지만 소유하지 않는 협력자 계약을 정의합니다.
//!
//! - `types.rs`: 데이터 타입 (InsightRequest, ProbeRequest, ProbeResponse)
//! - `traits.rs`: 인터페이스 (InsightProvider, ProbeTransport)

pub mod traits;
pub mod types;

pub use traits::{InsightProvider, ProbeTransport};
pub use types::{InsightRequest, ProbeMethod, ProbeRequest, ProbeResponse};
