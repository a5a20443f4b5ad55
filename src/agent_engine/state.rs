use crate::action::types::Action;
use crate::config::AgentSection;
use crate::perception::types::Screenshot;
use crate::prompts::{self, Lang};

/// Run parameters for one [`crate::agent_engine::engine::PhoneAgent`].
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_steps: u32,
    pub lang: Lang,
    pub system_prompt: String,
}

impl AgentConfig {
    pub fn new(max_steps: u32, lang: Lang) -> Self {
        Self {
            max_steps,
            lang,
            system_prompt: prompts::system_prompt(lang),
        }
    }

    /// Builds from the `[agent]` config section; a configured prompt replaces
    /// the built-in one.
    pub fn from_section(section: &AgentSection) -> Self {
        let lang = Lang::parse(&section.lang);
        let system_prompt = section
            .system_prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| prompts::system_prompt(lang));
        Self {
            max_steps: section.max_steps.max(1),
            lang,
            system_prompt,
        }
    }
}

/// Lifecycle of one agent run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    /// First step taken; the task is in context.
    Running,
    Continuing,
    Terminated(TerminationReason),
}

impl AgentPhase {
    pub fn is_terminated(&self) -> bool {
        matches!(self, AgentPhase::Terminated(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model emitted `finish(...)`.
    Finished,
    /// The executor ended the run (cancelled sensitive tap).
    ActionRequestedStop,
    PerceptionFailed,
    ModelFailed,
    StepBudgetExhausted,
    Cancelled,
}

/// Outcome of one perceive/think/act cycle.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub success: bool,
    pub finished: bool,
    pub action: Option<Action>,
    pub thinking: String,
    pub message: Option<String>,
    /// Screen the decision was made on; kept for diagnostics on model failure.
    pub screenshot: Option<Screenshot>,
}

impl StepResult {
    pub(crate) fn fault(message: String, screenshot: Option<Screenshot>) -> Self {
        Self {
            success: false,
            finished: true,
            action: None,
            thinking: String::new(),
            message: Some(message),
            screenshot,
        }
    }
}

/// How a [`crate::agent_engine::engine::PhoneAgent::run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Finished {
        message: String,
        success: bool,
        steps: u32,
    },
    StepBudgetExhausted {
        steps: u32,
    },
    Cancelled {
        steps: u32,
    },
}

pub const MAX_STEPS_MESSAGE: &str = "Max steps reached";
pub const CANCELLED_MESSAGE: &str = "Cancelled";
pub const DEFAULT_COMPLETION_MESSAGE: &str = "Task completed";

impl RunOutcome {
    pub fn message(&self) -> &str {
        match self {
            RunOutcome::Finished { message, .. } => message,
            RunOutcome::StepBudgetExhausted { .. } => MAX_STEPS_MESSAGE,
            RunOutcome::Cancelled { .. } => CANCELLED_MESSAGE,
        }
    }

    pub fn steps(&self) -> u32 {
        match self {
            RunOutcome::Finished { steps, .. }
            | RunOutcome::StepBudgetExhausted { steps }
            | RunOutcome::Cancelled { steps } => *steps,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Finished { success: true, .. })
    }
}
