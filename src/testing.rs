//! Scripted collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adb::apps;
use crate::errors::{PhoneClawError, PhoneClawResult};
use crate::executor::input::DeviceDriver;
use crate::executor::safety::{ConfirmationHook, TakeoverHook};
use crate::llm::provider::ModelClient;
use crate::llm::response::split_response;
use crate::llm::types::{ChatMessage, ModelResponse};
use crate::perception::traits::Perception;
use crate::perception::types::Screenshot;

pub const AUTOMATION_IME: &str = "com.android.adbkeyboard/.AdbIME";

/// Records every primitive as a short string, e.g. `"tap 360 802"`.
pub struct RecordingDriver {
    calls: Mutex<Vec<String>>,
    ime: Mutex<String>,
    fail_type: bool,
    panic_on_tap: bool,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::with_ime(AUTOMATION_IME)
    }

    pub fn with_ime(ime: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            ime: Mutex::new(ime.to_string()),
            fail_type: false,
            panic_on_tap: false,
        }
    }

    pub fn failing_type(mut self) -> Self {
        self.fail_type = true;
        self
    }

    pub fn panicking_tap(mut self) -> Self {
        self.panic_on_tap = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn current_ime(&self) -> String {
        self.ime.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DeviceDriver for RecordingDriver {
    async fn tap(&self, x: i32, y: i32) -> PhoneClawResult<()> {
        if self.panic_on_tap {
            panic!("touch injection crashed");
        }
        self.record(format!("tap {x} {y}"));
        Ok(())
    }

    async fn double_tap(&self, x: i32, y: i32) -> PhoneClawResult<()> {
        self.record(format!("double_tap {x} {y}"));
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32, duration_ms: u64) -> PhoneClawResult<()> {
        self.record(format!("long_press {x} {y} {duration_ms}"));
        Ok(())
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        _duration_ms: Option<u64>,
    ) -> PhoneClawResult<()> {
        self.record(format!("swipe {start_x} {start_y} {end_x} {end_y}"));
        Ok(())
    }

    async fn back(&self) -> PhoneClawResult<()> {
        self.record("back".into());
        Ok(())
    }

    async fn home(&self) -> PhoneClawResult<()> {
        self.record("home".into());
        Ok(())
    }

    async fn launch(&self, app_name: &str) -> PhoneClawResult<bool> {
        if apps::package_for(app_name).is_none() {
            return Ok(false);
        }
        self.record(format!("launch {app_name}"));
        Ok(true)
    }

    async fn type_text(&self, text: &str) -> PhoneClawResult<()> {
        if self.fail_type {
            return Err(PhoneClawError::Device("broadcast rejected".into()));
        }
        self.record(format!("type {text}"));
        Ok(())
    }

    async fn clear_text(&self) -> PhoneClawResult<()> {
        self.record("clear".into());
        Ok(())
    }

    async fn input_method(&self) -> PhoneClawResult<String> {
        Ok(self.current_ime())
    }

    async fn set_input_method(&self, ime: &str) -> PhoneClawResult<()> {
        self.record(format!("set_ime {ime}"));
        *self.ime.lock().unwrap() = ime.to_string();
        Ok(())
    }

    fn automation_input_method(&self) -> &str {
        AUTOMATION_IME
    }
}

/// Fixed answer to confirmations; records every prompt it sees.
pub struct ScriptedHooks {
    approve: bool,
    confirmations: Mutex<Vec<String>>,
    takeovers: Mutex<Vec<String>>,
}

impl ScriptedHooks {
    pub fn approving() -> Self {
        Self::answering(true)
    }

    pub fn denying() -> Self {
        Self::answering(false)
    }

    fn answering(approve: bool) -> Self {
        Self {
            approve,
            confirmations: Mutex::new(Vec::new()),
            takeovers: Mutex::new(Vec::new()),
        }
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn takeovers(&self) -> Vec<String> {
        self.takeovers.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConfirmationHook for ScriptedHooks {
    async fn confirm(&self, message: &str) -> bool {
        self.confirmations.lock().unwrap().push(message.to_string());
        self.approve
    }
}

#[async_trait]
impl TakeoverHook for ScriptedHooks {
    async fn takeover(&self, message: &str) {
        self.takeovers.lock().unwrap().push(message.to_string());
    }
}

/// Replays canned completions in order; the last one repeats forever.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(reply: &str) -> Self {
        Self::new([reply])
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Every context the model was called with.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn infer(&self, messages: &[ChatMessage]) -> PhoneClawResult<ModelResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(PhoneClawError::Model("401 Unauthorized".into()));
        }
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front().unwrap_or_default()
        } else {
            replies.front().cloned().unwrap_or_default()
        };
        Ok(split_response(&reply, ""))
    }
}

/// Fixed 720x1604 screen showing one app.
pub struct StaticPerception {
    app: String,
    fail: bool,
}

impl StaticPerception {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            app: String::new(),
            fail: true,
        }
    }
}

pub fn test_screenshot() -> Screenshot {
    Screenshot {
        base64_data: "iVBORw0KGgo=".into(),
        width: 720,
        height: 1604,
        is_fallback: false,
        is_sensitive: false,
    }
}

#[async_trait]
impl Perception for StaticPerception {
    async fn capture(&self) -> PhoneClawResult<Screenshot> {
        if self.fail {
            return Err(PhoneClawError::Device("error: device offline".into()));
        }
        Ok(test_screenshot())
    }

    async fn current_app(&self) -> PhoneClawResult<String> {
        Ok(self.app.clone())
    }
}
