use async_trait::async_trait;

use crate::errors::PhoneClawResult;
use crate::llm::types::{ChatMessage, ModelResponse};

/// Inference backend for the agent loop.
///
/// Malformed completions still come back as a `ModelResponse`; only
/// transport and auth failures are errors.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier used in logs.
    fn name(&self) -> &str;

    async fn infer(&self, messages: &[ChatMessage]) -> PhoneClawResult<ModelResponse>;
}
