use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::action::parse_action;
use crate::action::types::{Action, ActionResult};
use crate::agent_engine::context::ConversationContext;
use crate::agent_engine::history::{HistoryEntry, SessionHistory};
use crate::agent_engine::loop_control::{LoopController, StopHandle};
use crate::agent_engine::state::{
    AgentConfig, AgentPhase, RunOutcome, StepResult, TerminationReason, DEFAULT_COMPLETION_MESSAGE,
};
use crate::errors::{PhoneClawError, PhoneClawResult};
use crate::executor::safety::requires_approval;
use crate::executor::ActionExecutor;
use crate::llm::provider::ModelClient;
use crate::llm::types::ModelResponse;
use crate::perception::traits::Perception;
use crate::perception::types::{Observation, Screenshot};
use crate::prompts;

/// Drives perceive → infer → parse → act cycles for one task at a time.
///
/// Steps are strictly sequential; the screen the model reasons about is the
/// screen the action is executed on.
pub struct PhoneAgent {
    config: AgentConfig,
    perception: Arc<dyn Perception>,
    model: Arc<dyn ModelClient>,
    executor: ActionExecutor,

    // ── Per-run state, cleared together by reset() ───────────────────────
    context: ConversationContext,
    loop_ctrl: LoopController,
    phase: AgentPhase,

    history: Option<SessionHistory>,
}

impl PhoneAgent {
    pub fn new(
        config: AgentConfig,
        perception: Arc<dyn Perception>,
        model: Arc<dyn ModelClient>,
        executor: ActionExecutor,
    ) -> Self {
        let loop_ctrl = LoopController::new(config.max_steps);
        Self {
            config,
            perception,
            model,
            executor,
            context: ConversationContext::new(),
            loop_ctrl,
            phase: AgentPhase::Idle,
            history: None,
        }
    }

    pub fn with_session_history(mut self, history: SessionHistory) -> Self {
        tracing::info!(session = %history.session_id, path = %history.file_path().display(), "recording session");
        self.history = Some(history);
        self
    }

    /// Shares an externally created stop flag (e.g. one wired to Ctrl-C).
    pub fn with_stop_handle(mut self, handle: StopHandle) -> Self {
        self.loop_ctrl = LoopController::with_stop_handle(self.config.max_steps, handle);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.loop_ctrl.stop_handle()
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn step_count(&self) -> u32 {
        self.loop_ctrl.steps()
    }

    pub fn phase(&self) -> &AgentPhase {
        &self.phase
    }

    /// Clears context, step counter and phase for a new task.
    pub fn reset(&mut self) {
        self.context.clear();
        self.loop_ctrl.reset();
        self.phase = AgentPhase::Idle;
    }

    /// Runs `task` until the model finishes, the executor stops the run, the
    /// step budget runs out or a stop is requested.
    pub async fn run(&mut self, task: &str) -> PhoneClawResult<RunOutcome> {
        self.reset();
        tracing::info!(task = %task, max_steps = self.config.max_steps, model = self.model.name(), "run started");

        let mut result = self.step(Some(task)).await?;
        loop {
            let steps = self.loop_ctrl.steps();
            if result.finished {
                let message = result
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_COMPLETION_MESSAGE.to_string());
                tracing::info!(steps, success = result.success, message = %message, "run finished");
                return Ok(RunOutcome::Finished {
                    message,
                    success: result.success,
                    steps,
                });
            }
            if self.loop_ctrl.budget_exhausted() {
                tracing::warn!(steps, "step budget exhausted");
                return Ok(RunOutcome::StepBudgetExhausted { steps });
            }
            if self.loop_ctrl.stop_requested() {
                tracing::info!(steps, "run cancelled");
                self.phase = AgentPhase::Terminated(TerminationReason::Cancelled);
                return Ok(RunOutcome::Cancelled { steps });
            }
            result = self.step(None).await?;
        }
    }

    /// Executes one step. The first step of a run needs the task text; later
    /// steps ignore `task`.
    pub async fn step(&mut self, task: Option<&str>) -> PhoneClawResult<StepResult> {
        if self.phase.is_terminated() {
            return Err(PhoneClawError::Agent(
                "run already terminated; call reset() before stepping again".into(),
            ));
        }

        let task = if self.loop_ctrl.is_first_step() {
            match task.map(str::trim).filter(|t| !t.is_empty()) {
                Some(t) => Some(t.to_string()),
                None => {
                    return Err(PhoneClawError::Agent(
                        "Task is required for the first step".into(),
                    ))
                }
            }
        } else {
            None
        };

        let result = self.execute_step(task.as_deref()).await;
        Ok(result)
    }

    async fn execute_step(&mut self, task: Option<&str>) -> StepResult {
        let step = self.loop_ctrl.begin_step();
        tracing::info!(step, max = self.loop_ctrl.max_steps(), "step started");

        // 1. Perceive.
        let observed = self.observe().await;
        let observation = match observed {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(step, error = %e, "perception failed");
                self.phase = AgentPhase::Terminated(TerminationReason::PerceptionFailed);
                return StepResult::fault(format!("Failed to capture screen or app info: {e}"), None);
            }
        };
        let screenshot = observation.screenshot;

        // 2. Context.
        let screen_info = serde_json::json!({ "current_app": observation.current_app }).to_string();
        let user_text = match task {
            Some(task) => {
                self.context.push_system(self.config.system_prompt.clone());
                format!("{task}\n\n{screen_info}")
            }
            None => format!("** Screen Info **\n\n{screen_info}"),
        };
        self.context.push_user(user_text.clone(), Some(&screenshot.base64_data));
        self.record(step, "user", Some(user_text), None);

        // 3. Infer.
        let inferred = self.model.infer(self.context.messages()).await;
        let response = match inferred {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(step, error = %e, "model call failed");
                self.context.strip_last_user_image();
                self.phase = AgentPhase::Terminated(TerminationReason::ModelFailed);
                return StepResult::fault(model_error_message(&e), Some(screenshot));
            }
        };

        // 4. Parse. Unparsable output ends the run.
        let action = match parse_action(&response.action) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(step, error = %e, "action parsing failed");
                Action::finish(format!(
                    "Failed to parse model action. Raw output: {}",
                    response.action
                ))
            }
        };
        self.log_decision(step, &response, &action);

        // 5–6. Image is single-use; keep the reasoning for the next turn.
        self.context.strip_last_user_image();
        self.context.push_assistant(format!(
            "<think>{}</think><answer>{}</answer>",
            response.thinking, response.action
        ));
        self.record(
            step,
            "assistant",
            Some(response.thinking.clone()),
            serde_json::to_value(&action).ok(),
        );

        // 7. Act.
        let result = self.execute_guarded(&action, &screenshot).await;

        // 8. Outcome.
        let finished = action.is_finish() || result.should_finish;
        self.phase = if finished {
            let reason = if action.is_finish() {
                TerminationReason::Finished
            } else {
                TerminationReason::ActionRequestedStop
            };
            AgentPhase::Terminated(reason)
        } else if self.loop_ctrl.budget_exhausted() {
            AgentPhase::Terminated(TerminationReason::StepBudgetExhausted)
        } else if step == 1 {
            AgentPhase::Running
        } else {
            AgentPhase::Continuing
        };

        if finished {
            let msgs = prompts::messages(self.config.lang);
            let detail = result
                .message
                .as_deref()
                .or(action.message())
                .unwrap_or(msgs.done);
            tracing::info!(step, success = result.success, "{}: {detail}", msgs.task_completed);
        }

        let message = result
            .message
            .or_else(|| action.message().map(str::to_string));
        StepResult {
            success: result.success,
            finished,
            action: Some(action),
            thinking: response.thinking,
            message,
            screenshot: Some(screenshot),
        }
    }

    async fn observe(&self) -> PhoneClawResult<Observation> {
        let screenshot = self.perception.capture().await?;
        let current_app = self.perception.current_app().await?;
        if screenshot.is_fallback {
            tracing::warn!(sensitive = screenshot.is_sensitive, "using fallback screenshot");
        }
        tracing::debug!(app = %current_app, width = screenshot.width, height = screenshot.height, "observed");
        Ok(Observation {
            screenshot,
            current_app,
        })
    }

    /// Runs the executor; a panic inside it is downgraded to a finish
    /// carrying the panic text.
    async fn execute_guarded(&self, action: &Action, screenshot: &Screenshot) -> ActionResult {
        let (w, h) = (screenshot.width, screenshot.height);
        match AssertUnwindSafe(self.executor.execute(action, w, h))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                tracing::error!(action = action.name(), detail = %detail, "action execution panicked");
                let fallback = Action::finish(format!("Action execution failed: {detail}"));
                self.executor.execute(&fallback, w, h).await
            }
        }
    }

    fn log_decision(&self, step: u32, response: &ModelResponse, action: &Action) {
        let msgs = prompts::messages(self.config.lang);
        tracing::info!(step, "{}: {}", msgs.thinking, response.thinking);
        let rendered = serde_json::to_string(action).unwrap_or_else(|_| action.name().to_string());
        tracing::info!(
            step,
            action = action.name(),
            sensitive = requires_approval(action),
            "{}: {rendered}",
            msgs.action
        );
    }

    fn record(&mut self, step: u32, role: &str, content: Option<String>, action: Option<serde_json::Value>) {
        if let Some(history) = self.history.as_mut() {
            if let Err(e) = history.record(HistoryEntry::new(step, role, content, action)) {
                tracing::warn!(error = %e, "failed to write session history");
            }
        }
    }
}

fn model_error_message(e: &PhoneClawError) -> String {
    match e {
        PhoneClawError::Model(detail) => format!("Model error: {detail}"),
        other => format!("Model error: {other}"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::Lang;
    use crate::testing::{RecordingDriver, ScriptedHooks, ScriptedModel, StaticPerception};

    struct Harness {
        agent: PhoneAgent,
        driver: Arc<RecordingDriver>,
        model: Arc<ScriptedModel>,
    }

    fn harness_with(
        max_steps: u32,
        model: ScriptedModel,
        driver: RecordingDriver,
        hooks: ScriptedHooks,
        perception: Arc<dyn Perception>,
    ) -> Harness {
        let driver = Arc::new(driver);
        let model = Arc::new(model);
        let hooks = Arc::new(hooks);
        let executor = ActionExecutor::new(driver.clone(), hooks.clone(), hooks)
            .with_type_settle(std::time::Duration::ZERO);
        let config = AgentConfig {
            max_steps,
            lang: Lang::En,
            system_prompt: "SYSTEM".into(),
        };
        let agent = PhoneAgent::new(config, perception, model.clone(), executor);
        Harness {
            agent,
            driver,
            model,
        }
    }

    fn harness(max_steps: u32, model: ScriptedModel) -> Harness {
        harness_with(
            max_steps,
            model,
            RecordingDriver::new(),
            ScriptedHooks::approving(),
            Arc::new(StaticPerception::new("微信")),
        )
    }

    #[tokio::test]
    async fn budget_exhaustion_is_an_outcome_not_an_error() {
        let mut h = harness(3, ScriptedModel::repeating(r#"do(action="Back")"#));
        let outcome = h.agent.run("scroll forever").await.unwrap();
        assert_eq!(outcome, RunOutcome::StepBudgetExhausted { steps: 3 });
        assert_eq!(outcome.message(), "Max steps reached");
        assert_eq!(h.driver.calls(), vec!["back", "back", "back"]);
        assert_eq!(h.model.requests().len(), 3);
        assert_eq!(
            h.agent.phase(),
            &AgentPhase::Terminated(TerminationReason::StepBudgetExhausted)
        );
    }

    #[tokio::test]
    async fn only_the_live_screenshot_is_sent() {
        let mut h = harness(4, ScriptedModel::repeating(r#"do(action="Home")"#));
        h.agent.run("go home").await.unwrap();
        for request in h.model.requests() {
            let images: usize = request.iter().map(|m| m.image_count()).sum();
            assert_eq!(images, 1);
            assert_eq!(request.last().unwrap().image_count(), 1);
        }
        assert_eq!(h.agent.context().image_count(), 0);
    }

    #[tokio::test]
    async fn context_shape_across_steps() {
        let mut h = harness(
            5,
            ScriptedModel::new([
                "<think>open chat</think><answer>do(action=\"Tap\", element=[500,500])</answer>",
                "finish(message=\"sent\")",
            ]),
        );
        let outcome = h.agent.run("message Bob").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Finished {
                message: "sent".into(),
                success: true,
                steps: 2,
            }
        );

        let msgs = h.agent.context().messages();
        assert_eq!(msgs.len(), 5);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[0].text(), "SYSTEM");
        assert_eq!(msgs[1].text(), "message Bob\n\n{\"current_app\":\"微信\"}");
        assert_eq!(
            msgs[2].text(),
            "<think>open chat</think><answer>do(action=\"Tap\", element=[500,500])</answer>"
        );
        assert_eq!(msgs[3].text(), "** Screen Info **\n\n{\"current_app\":\"微信\"}");
        assert_eq!(msgs[4].role, "assistant");
        assert_eq!(h.driver.calls(), vec!["tap 360 802"]);
    }

    #[tokio::test]
    async fn finish_and_plain_tap_flags() {
        let mut h = harness(
            5,
            ScriptedModel::new([r#"do(action="Tap", element=[10,10])"#, r#"finish(message="ok")"#]),
        );
        let first = h.agent.step(Some("task")).await.unwrap();
        assert!(!first.finished);
        assert!(first.success);
        assert_eq!(h.agent.phase(), &AgentPhase::Running);

        let second = h.agent.step(None).await.unwrap();
        assert!(second.finished);
        assert_eq!(second.message.as_deref(), Some("ok"));
        assert_eq!(
            h.agent.phase(),
            &AgentPhase::Terminated(TerminationReason::Finished)
        );
        assert!(matches!(
            h.agent.step(None).await,
            Err(PhoneClawError::Agent(_))
        ));
    }

    #[tokio::test]
    async fn first_step_requires_a_task() {
        let mut h = harness(5, ScriptedModel::repeating(r#"do(action="Back")"#));
        assert!(matches!(
            h.agent.step(None).await,
            Err(PhoneClawError::Agent(_))
        ));
        assert!(h.agent.step(Some("   ")).await.is_err());
        assert_eq!(h.agent.step_count(), 0);
    }

    #[tokio::test]
    async fn unknown_action_keeps_running() {
        let mut h = harness(
            5,
            ScriptedModel::new([r#"do(action="Teleport")"#, r#"finish(message="done")"#]),
        );
        let first = h.agent.step(Some("task")).await.unwrap();
        assert!(!first.finished);
        assert!(!first.success);
        assert_eq!(first.message.as_deref(), Some("Unknown action: Teleport"));

        let second = h.agent.step(None).await.unwrap();
        assert!(second.finished);
    }

    #[tokio::test]
    async fn unparsable_output_ends_the_run() {
        let mut h = harness(5, ScriptedModel::repeating("I am lost"));
        let result = h.agent.step(Some("task")).await.unwrap();
        assert!(result.finished);
        assert_eq!(
            result.message.as_deref(),
            Some("Failed to parse model action. Raw output: I am lost")
        );
        assert!(result.action.unwrap().is_finish());
        assert!(h.driver.calls().is_empty());
    }

    #[tokio::test]
    async fn perception_failure_is_terminal() {
        let mut h = harness_with(
            5,
            ScriptedModel::repeating(r#"do(action="Back")"#),
            RecordingDriver::new(),
            ScriptedHooks::approving(),
            Arc::new(StaticPerception::failing()),
        );
        let result = h.agent.step(Some("task")).await.unwrap();
        assert!(result.finished && !result.success);
        assert!(result
            .message
            .unwrap()
            .starts_with("Failed to capture screen or app info:"));
        assert!(result.screenshot.is_none());
        assert!(h.model.requests().is_empty());
        assert_eq!(
            h.agent.phase(),
            &AgentPhase::Terminated(TerminationReason::PerceptionFailed)
        );
    }

    #[tokio::test]
    async fn model_failure_keeps_the_screenshot() {
        let mut h = harness(5, ScriptedModel::failing());
        let outcome = h.agent.run("task").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Finished {
                message: "Model error: 401 Unauthorized".into(),
                success: false,
                steps: 1,
            }
        );
        assert_eq!(h.agent.context().image_count(), 0);

        h.agent.reset();
        let result = h.agent.step(Some("again")).await.unwrap();
        assert_eq!(result.screenshot.unwrap().width, 720);
    }

    #[tokio::test]
    async fn cancelled_sensitive_tap_stops_without_success() {
        let mut h = harness_with(
            5,
            ScriptedModel::repeating(r#"do(action="Tap", element=[950,950], message="Pay 25 CNY")"#),
            RecordingDriver::new(),
            ScriptedHooks::denying(),
            Arc::new(StaticPerception::new("美团")),
        );
        let outcome = h.agent.run("order coffee").await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Finished {
                message: "User cancelled".into(),
                success: false,
                steps: 1,
            }
        );
        assert!(h.driver.calls().is_empty());
        assert_eq!(
            h.agent.phase(),
            &AgentPhase::Terminated(TerminationReason::ActionRequestedStop)
        );
    }

    #[tokio::test]
    async fn executor_panic_becomes_a_finish() {
        let mut h = harness_with(
            5,
            ScriptedModel::repeating(r#"do(action="Tap", element=[1,1])"#),
            RecordingDriver::new().panicking_tap(),
            ScriptedHooks::approving(),
            Arc::new(StaticPerception::new("微信")),
        );
        let result = h.agent.step(Some("task")).await.unwrap();
        assert!(result.finished);
        assert_eq!(
            result.message.as_deref(),
            Some("Action execution failed: touch injection crashed")
        );
        // The assistant turn was recorded before execution.
        assert_eq!(h.agent.context().messages().last().unwrap().role, "assistant");
    }

    struct StoppingPerception {
        inner: StaticPerception,
        stop: StopHandle,
    }

    #[async_trait::async_trait]
    impl Perception for StoppingPerception {
        async fn capture(&self) -> PhoneClawResult<Screenshot> {
            self.stop.stop();
            self.inner.capture().await
        }

        async fn current_app(&self) -> PhoneClawResult<String> {
            self.inner.current_app().await
        }
    }

    #[tokio::test]
    async fn stop_request_cancels_between_steps() {
        let stop = StopHandle::new();
        let perception = Arc::new(StoppingPerception {
            inner: StaticPerception::new("微信"),
            stop: stop.clone(),
        });
        let h = harness_with(
            10,
            ScriptedModel::repeating(r#"do(action="Back")"#),
            RecordingDriver::new(),
            ScriptedHooks::approving(),
            perception,
        );
        let mut agent = h.agent.with_stop_handle(stop);
        let outcome = agent.run("task").await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled { steps: 1 });
        assert_eq!(h.driver.calls(), vec!["back"]);
    }

    #[tokio::test]
    async fn run_resets_previous_state() {
        let mut h = harness(5, ScriptedModel::repeating(r#"finish(message="ok")"#));
        h.agent.run("one").await.unwrap();
        let outcome = h.agent.run("two").await.unwrap();
        assert_eq!(outcome.steps(), 1);
        assert_eq!(h.agent.context().len(), 3);
        assert_eq!(h.agent.context().messages()[1].text(), "two\n\n{\"current_app\":\"微信\"}");
    }

    #[tokio::test]
    async fn session_history_records_each_turn() {
        let dir = std::env::temp_dir().join(format!("phoneclaw-engine-{}", uuid::Uuid::new_v4()));
        let h = harness(5, ScriptedModel::repeating(r#"finish(message="ok")"#));
        let mut agent = h.agent.with_session_history(SessionHistory::in_dir(&dir));
        agent.run("task").await.unwrap();

        let path = agent.history.as_ref().unwrap().file_path().to_path_buf();
        let lines = std::fs::read_to_string(&path).unwrap();
        assert_eq!(lines.lines().count(), 2);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
