//! # redwhisper-provider
//!
//! Concrete collaborators for the RedWhisper core.
//!
//! ## Features
//! - OpenAI-compatible insight provider (chat completions)
//! - HTTP probe transport with a persistent cookie session
//! - Automatic retry with exponential backoff

pub mod error;
pub mod probe;
pub mod providers;
pub mod retry;

// Error and retry
pub use error::ProviderError;
pub use retry::{with_retry, RetryClassification, RetryConfig, RetryableError};

// Implementations
pub use probe::HttpProbe;
pub use providers::openai::OpenAiInsightProvider;
