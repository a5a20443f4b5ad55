use serde::{Deserialize, Serialize};

/// A point on the model's normalized 0–1000 screen grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

/// Coordinate field of an action, resolved at parse time.
///
/// Malformed values do not fail the whole parse; the executor reports them
/// as a failure of that single action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Coordinate {
    Point(NormPoint),
    Missing,
    Malformed { raw: String },
}

impl Coordinate {
    pub fn point(x: f64, y: f64) -> Self {
        Coordinate::Point(NormPoint { x, y })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Launch { app: Option<String> },
    /// A tap carrying `message` is sensitive and needs confirmation.
    Tap { element: Coordinate, message: Option<String> },
    Type { text: String },
    Swipe { start: Coordinate, end: Coordinate },
    Back,
    Home,
    DoubleTap { element: Coordinate },
    LongPress { element: Coordinate },
    /// Raw duration as written by the model, e.g. `"3 seconds"`.
    Wait { duration: Option<String> },
    Takeover { message: String },
    Note { message: Option<String> },
    CallApi { instruction: Option<String> },
    Interact,
    Finish { message: Option<String> },
    /// A `do(...)` call whose action name has no handler.
    Unknown { name: String },
}

impl Action {
    pub fn finish(message: impl Into<String>) -> Self {
        Action::Finish {
            message: Some(message.into()),
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Action::Finish { .. })
    }

    /// Free-text message attached to the action, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Action::Tap { message, .. }
            | Action::Note { message }
            | Action::Finish { message } => message.as_deref(),
            Action::Takeover { message } => Some(message),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Launch { .. } => "Launch",
            Action::Tap { .. } => "Tap",
            Action::Type { .. } => "Type",
            Action::Swipe { .. } => "Swipe",
            Action::Back => "Back",
            Action::Home => "Home",
            Action::DoubleTap { .. } => "Double Tap",
            Action::LongPress { .. } => "Long Press",
            Action::Wait { .. } => "Wait",
            Action::Takeover { .. } => "Take_over",
            Action::Note { .. } => "Note",
            Action::CallApi { .. } => "Call_API",
            Action::Interact => "Interact",
            Action::Finish { .. } => "finish",
            Action::Unknown { name } => name,
        }
    }
}

/// Outcome of executing one action.
///
/// `should_finish` is independent of `success`: a cancelled sensitive tap
/// ends the run without the tap having happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub should_finish: bool,
    pub message: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            should_finish: false,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            should_finish: false,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            should_finish: false,
            message: Some(message.into()),
        }
    }

    pub fn finished(success: bool, message: Option<String>) -> Self {
        Self {
            success,
            should_finish: true,
            message,
        }
    }
}
