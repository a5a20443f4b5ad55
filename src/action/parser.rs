use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::action::grammar::{self, Call, Callee, Literal};
use crate::action::types::{Action, Coordinate, NormPoint};
use crate::errors::{PhoneClawError, PhoneClawResult};

/// Box-delimiter tokens some GLM models wrap their answer in.
pub const BOX_MARKERS: [&str; 2] = ["<|begin_of_box|>", "<|end_of_box|>"];

/// Message of the finish action synthesized from a bare "finish" mention.
pub const RECOVERED_FINISH_MESSAGE: &str = "Task Completed";

fn call_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(do|finish)\s*\(").expect("valid regex"))
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

pub fn strip_markers(text: &str) -> String {
    BOX_MARKERS
        .iter()
        .fold(text.to_string(), |acc, marker| acc.replace(marker, ""))
}

/// Turns raw model output into exactly one [`Action`].
///
/// Layers, most precise first: the first `do(...)`/`finish(...)` expression
/// that evaluates under the closed grammar; then, if the text mentions
/// "finish" anywhere, a synthesized finish; otherwise a parse error.
pub fn parse_action(raw: &str) -> PhoneClawResult<Action> {
    let cleaned = strip_markers(raw);

    if let Some(call) = find_action_call(&cleaned) {
        let action = action_from_call(call);
        tracing::debug!(action = action.name(), "action expression parsed");
        return Ok(action);
    }

    if cleaned.contains("finish") {
        tracing::debug!("no evaluable action expression; recovering a finish");
        return Ok(Action::finish(RECOVERED_FINISH_MESSAGE));
    }

    Err(PhoneClawError::Parse(format!(
        "no action expression found in: {}",
        raw.trim()
    )))
}

/// First `do(`/`finish(` occurrence that parses as a complete call.
pub fn find_action_call(text: &str) -> Option<Call> {
    locate_call(text).map(|(call, _)| call)
}

/// Byte range of the expression [`find_action_call`] would evaluate.
pub fn find_action_call_span(text: &str) -> Option<Range<usize>> {
    locate_call(text).map(|(_, span)| span)
}

fn locate_call(text: &str) -> Option<(Call, Range<usize>)> {
    for m in call_start_re().find_iter(text) {
        match grammar::parse_call(&text[m.start()..]) {
            Ok((call, used)) => return Some((call, m.start()..m.start() + used)),
            Err(e) => tracing::debug!(offset = m.start(), error = %e, "candidate rejected"),
        }
    }
    None
}

/// Maps an evaluated call onto the closed action set. Names without a
/// handler become [`Action::Unknown`] instead of an error.
pub fn action_from_call(call: Call) -> Action {
    if call.callee == Callee::Finish {
        return Action::Finish {
            message: call.text("message"),
        };
    }

    let name = call.text("action").unwrap_or_default();
    match canonical_name(&name).as_str() {
        "launch" => Action::Launch {
            app: call.text("app"),
        },
        "tap" => Action::Tap {
            element: coordinate_field(&call, "element"),
            message: call.text("message"),
        },
        "type" | "typename" => Action::Type {
            text: call.text("text").unwrap_or_default(),
        },
        "swipe" => Action::Swipe {
            start: coordinate_field(&call, "start"),
            end: coordinate_field(&call, "end"),
        },
        "back" => Action::Back,
        "home" => Action::Home,
        "doubletap" => Action::DoubleTap {
            element: coordinate_field(&call, "element"),
        },
        "longpress" => Action::LongPress {
            element: coordinate_field(&call, "element"),
        },
        "wait" => Action::Wait {
            duration: call.text("duration"),
        },
        "takeover" => Action::Takeover {
            message: call
                .text("message")
                .unwrap_or_else(|| "Intervention required".to_string()),
        },
        "note" => Action::Note {
            message: call.text("message"),
        },
        "callapi" => Action::CallApi {
            instruction: call.text("instruction"),
        },
        "interact" => Action::Interact,
        _ => Action::Unknown { name },
    }
}

/// `"Long Press"`, `"long_press"` and `"LongPress"` all name the same action.
fn canonical_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn coordinate_field(call: &Call, key: &str) -> Coordinate {
    match call.get(key) {
        None => Coordinate::Missing,
        Some(lit) => match point_from_literal(lit) {
            Ok(p) => Coordinate::Point(p),
            Err(e) => {
                tracing::warn!(field = key, error = %e, "malformed coordinate");
                Coordinate::Malformed {
                    raw: lit.as_text(),
                }
            }
        },
    }
}

/// Normalizes a coordinate value: a native list, a string holding a list
/// literal, or free text with at least two integers.
pub fn point_from_literal(lit: &Literal) -> PhoneClawResult<NormPoint> {
    match lit {
        Literal::List(items) => point_from_items(items),
        Literal::Str(s) => {
            let s = s.trim();
            if let Ok(Literal::List(items)) = grammar::parse_literal(s) {
                return point_from_items(&items);
            }
            let nums: Vec<f64> = integer_re()
                .find_iter(s)
                .take(2)
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .collect();
            match nums.as_slice() {
                [x, y] => Ok(NormPoint { x: *x, y: *y }),
                _ => Err(PhoneClawError::Parse(format!("Invalid element format: {s}"))),
            }
        }
        Literal::Number(_) => Err(PhoneClawError::Parse(format!(
            "Invalid element format: {lit}"
        ))),
    }
}

fn point_from_items(items: &[Literal]) -> PhoneClawResult<NormPoint> {
    let component = |lit: &Literal| match lit {
        Literal::Number(n) => Some(*n),
        Literal::Str(s) => s.trim().parse::<f64>().ok(),
        Literal::List(_) => None,
    };
    match items {
        [x, y, ..] => match (component(x), component(y)) {
            (Some(x), Some(y)) => Ok(NormPoint { x, y }),
            _ => Err(PhoneClawError::Parse(format!(
                "Invalid element format: {}",
                Literal::List(items.to_vec())
            ))),
        },
        _ => Err(PhoneClawError::Parse(format!(
            "Invalid element format: {}",
            Literal::List(items.to_vec())
        ))),
    }
}
