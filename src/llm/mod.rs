pub mod provider;
pub mod providers;
pub mod response;
pub mod sse_parser;
pub mod types;

pub use provider::ModelClient;
pub use providers::openai_compatible::OpenAiCompatibleProvider;
pub use types::{ChatMessage, ModelResponse};
