//! Payload-probe engine shared by the agent variants

mod engine;
mod stage;

pub use engine::{ProbeEngine, EVIDENCE_CHARS, SUGGESTION_STAGE};
pub use stage::{Delivery, FindingTemplate, ProbeProfile, ProbeStage};
