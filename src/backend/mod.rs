//! Generative backend seam.
//!
//! The orchestrator, narrator and brainstorm flow only see
//! [`GenerationBackend`]; `GeminiBackend` is the HTTP implementation.

pub mod gemini;
#[cfg(test)]
pub mod mock;
pub mod prompts;

pub use gemini::{GeminiBackend, GeminiSettings};

use crate::errors::BackendError;
use crate::ideas::RefinedIdea;
use async_trait::async_trait;

/// A synthesized narration. Either half may be missing from a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utterance {
    /// Base64 of headerless 16-bit LE PCM.
    pub audio_base64: Option<String>,
    pub transcript: Option<String>,
}

/// Abstraction over the generative backend for testability.
/// Real implementation: `GeminiBackend`. Tests use scripted doubles.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Produce the raw artifact text for one task.
    async fn generate(&self, idea: &str, task: &str, phase: &str) -> Result<String, BackendError>;

    /// Speak a short status update about `topic`.
    async fn synthesize(&self, topic: &str) -> Result<Utterance, BackendError>;

    async fn brainstorm(&self, idea: &str) -> Result<RefinedIdea, BackendError>;
}
