use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;

use crate::action::types::{Action, ActionResult, Coordinate};
use crate::errors::PhoneClawResult;
use crate::executor::coordinator;
use crate::executor::input::DeviceDriver;
use crate::executor::safety::{ConfirmationHook, TakeoverHook};
use crate::executor::text_input;

const LONG_PRESS_MS: u64 = 1000;
const DEFAULT_WAIT_SECS: f64 = 1.0;
const MAX_WAIT_SECS: f64 = 600.0;

/// Maps parsed actions onto device primitives.
pub struct ActionExecutor {
    driver: Arc<dyn DeviceDriver>,
    confirmation: Arc<dyn ConfirmationHook>,
    takeover: Arc<dyn TakeoverHook>,
    type_settle: Duration,
}

impl ActionExecutor {
    pub fn new(
        driver: Arc<dyn DeviceDriver>,
        confirmation: Arc<dyn ConfirmationHook>,
        takeover: Arc<dyn TakeoverHook>,
    ) -> Self {
        Self {
            driver,
            confirmation,
            takeover,
            type_settle: Duration::from_millis(500),
        }
    }

    pub fn with_type_settle(mut self, settle: Duration) -> Self {
        self.type_settle = settle;
        self
    }

    /// Executes one action against the given screen geometry.
    /// Device faults are reported in the result, never returned as errors.
    pub async fn execute(&self, action: &Action, screen_width: u32, screen_height: u32) -> ActionResult {
        match self.dispatch(action, screen_width, screen_height).await {
            Ok(result) => {
                tracing::info!(
                    action = action.name(),
                    success = result.success,
                    should_finish = result.should_finish,
                    detail = result.message.as_deref().unwrap_or(""),
                    "action executed"
                );
                result
            }
            Err(e) => {
                tracing::error!(action = action.name(), error = %e, "action execution failed");
                ActionResult::failed(format!("Action failed: {e}"))
            }
        }
    }

    async fn dispatch(&self, action: &Action, w: u32, h: u32) -> PhoneClawResult<ActionResult> {
        match action {
            Action::Finish { message } => Ok(ActionResult::finished(true, message.clone())),

            Action::Launch { app } => {
                let Some(app) = app.as_deref().map(str::trim).filter(|a| !a.is_empty()) else {
                    return Ok(ActionResult::failed("No app name specified"));
                };
                if self.driver.launch(app).await? {
                    Ok(ActionResult::ok())
                } else {
                    Ok(ActionResult::failed(format!("App not found: {app}")))
                }
            }

            Action::Tap { element, message } => {
                let (x, y) = match pixel("element", element, w, h) {
                    Ok(p) => p,
                    Err(failed) => return Ok(failed),
                };
                if let Some(message) = message {
                    if !self.confirmation.confirm(message).await {
                        tracing::info!(reason = %message, "sensitive tap cancelled by user");
                        return Ok(ActionResult::finished(false, Some("User cancelled".into())));
                    }
                }
                tracing::info!(x, y, "tap");
                self.driver.tap(x, y).await?;
                Ok(ActionResult::ok())
            }

            Action::Type { text } => {
                text_input::type_with_automation_keyboard(self.driver.as_ref(), text, self.type_settle)
                    .await?;
                Ok(ActionResult::ok())
            }

            Action::Swipe { start, end } => {
                let (sx, sy) = match pixel("start", start, w, h) {
                    Ok(p) => p,
                    Err(failed) => return Ok(failed),
                };
                let (ex, ey) = match pixel("end", end, w, h) {
                    Ok(p) => p,
                    Err(failed) => return Ok(failed),
                };
                tracing::info!(sx, sy, ex, ey, "swipe");
                self.driver.swipe(sx, sy, ex, ey, None).await?;
                Ok(ActionResult::ok())
            }

            Action::Back => {
                self.driver.back().await?;
                Ok(ActionResult::ok())
            }

            Action::Home => {
                self.driver.home().await?;
                Ok(ActionResult::ok())
            }

            Action::DoubleTap { element } => {
                let (x, y) = match pixel("element", element, w, h) {
                    Ok(p) => p,
                    Err(failed) => return Ok(failed),
                };
                tracing::info!(x, y, "double tap");
                self.driver.double_tap(x, y).await?;
                Ok(ActionResult::ok())
            }

            Action::LongPress { element } => {
                let (x, y) = match pixel("element", element, w, h) {
                    Ok(p) => p,
                    Err(failed) => return Ok(failed),
                };
                tracing::info!(x, y, "long press");
                self.driver.long_press(x, y, LONG_PRESS_MS).await?;
                Ok(ActionResult::ok())
            }

            Action::Wait { duration } => {
                let secs = parse_wait_seconds(duration.as_deref());
                tracing::info!(secs, "waiting");
                tokio::time::sleep(Duration::from_secs_f64(secs)).await;
                Ok(ActionResult::ok())
            }

            Action::Takeover { message } => {
                tracing::info!(reason = %message, "handing control to operator");
                self.takeover.takeover(message).await;
                tracing::info!("operator resumed");
                Ok(ActionResult::ok())
            }

            Action::Note { .. } | Action::CallApi { .. } => Ok(ActionResult::ok()),

            Action::Interact => Ok(ActionResult::ok_with("Interaction required")),

            Action::Unknown { name } => {
                tracing::warn!(name = %name, "no handler for action");
                Ok(ActionResult::failed(format!("Unknown action: {name}")))
            }
        }
    }
}

fn pixel(
    field: &'static str,
    coordinate: &Coordinate,
    w: u32,
    h: u32,
) -> Result<(i32, i32), ActionResult> {
    coordinator::resolve(field, coordinate, w, h).map_err(|e| ActionResult::failed(e.to_string()))
}

fn wait_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)").expect("valid regex"))
}

/// Leading number of a duration such as `"3 seconds"`; unparsable values
/// fall back to one second.
pub fn parse_wait_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|s| wait_re().captures(s))
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.min(MAX_WAIT_SECS))
        .unwrap_or(DEFAULT_WAIT_SECS)
}
