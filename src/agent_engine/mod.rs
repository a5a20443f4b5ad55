pub mod context;
pub mod engine;
pub mod history;
pub mod loop_control;
pub mod state;

pub use engine::PhoneAgent;
pub use loop_control::StopHandle;
pub use state::{AgentConfig, AgentPhase, RunOutcome, StepResult};
