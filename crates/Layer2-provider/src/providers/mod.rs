//! Insight provider implementations

pub mod openai;
