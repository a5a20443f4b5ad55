use async_trait::async_trait;

use crate::errors::PhoneClawResult;
use crate::perception::types::Screenshot;

/// Source of screen state for the agent loop.
///
/// "Can't tell" conditions (secure screens, unreadable captures) must come
/// back as a fallback screenshot, not an error. Errors are reserved for the
/// device being unreachable.
#[async_trait]
pub trait Perception: Send + Sync {
    async fn capture(&self) -> PhoneClawResult<Screenshot>;

    /// Display name of the foreground app.
    async fn current_app(&self) -> PhoneClawResult<String>;
}
