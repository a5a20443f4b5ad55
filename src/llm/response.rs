use crate::action::parser::{find_action_call_span, strip_markers};
use crate::llm::types::ModelResponse;

const EMPTY_RESPONSE_ACTION: &str = "finish(message=\"Empty response\")";

/// Splits a completion into thinking and raw action text.
///
/// Thinking prefers the provider's native reasoning channel, then a
/// `<think>` block, then whatever precedes `<answer>`. The action is the first
/// `do(...)`/`finish(...)` expression, else the `<answer>` body, else the
/// whole marker-stripped content.
pub fn split_response(content: &str, reasoning: &str) -> ModelResponse {
    if content.trim().is_empty() && reasoning.trim().is_empty() {
        return ModelResponse {
            thinking: String::new(),
            action: EMPTY_RESPONSE_ACTION.to_string(),
            raw_content: content.to_string(),
        };
    }

    let thinking = if !reasoning.trim().is_empty() {
        reasoning.trim().to_string()
    } else if let Some((before, _)) = content.split_once("</think>") {
        before.replace("<think>", "").trim().to_string()
    } else if let Some((before, _)) = content.split_once("<answer>") {
        before.trim().to_string()
    } else {
        String::new()
    };

    let cleaned = strip_markers(content);
    let action = if let Some(span) = find_action_call_span(&cleaned) {
        cleaned[span].replace('\n', " ").trim().to_string()
    } else if let Some((_, after)) = cleaned.split_once("<answer>") {
        after.replace("</answer>", "").trim().to_string()
    } else {
        cleaned.trim().to_string()
    };

    ModelResponse {
        thinking,
        action,
        raw_content: content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_and_answer_tags() {
        let r = split_response(
            "<think>The search box is at the top.</think>\n<answer>do(action=\"Tap\", element=[500, 80])</answer>",
            "",
        );
        assert_eq!(r.thinking, "The search box is at the top.");
        assert_eq!(r.action, "do(action=\"Tap\", element=[500, 80])");
    }

    #[test]
    fn native_reasoning_wins_over_tags() {
        let r = split_response("<think>inline</think>finish(message=\"ok\")", "native chain");
        assert_eq!(r.thinking, "native chain");
        assert_eq!(r.action, "finish(message=\"ok\")");
    }

    #[test]
    fn boxed_multiline_action_is_flattened() {
        let r = split_response(
            "Looking at the feed.<answer><|begin_of_box|>do(action=\"Swipe\",\nstart=[500,800],\nend=[500,200])<|end_of_box|></answer>",
            "",
        );
        assert_eq!(r.thinking, "Looking at the feed.");
        assert_eq!(r.action, "do(action=\"Swipe\", start=[500,800], end=[500,200])");
    }

    #[test]
    fn answer_body_is_used_without_a_call() {
        let r = split_response("<answer>I cannot continue</answer>", "");
        assert_eq!(r.action, "I cannot continue");
    }

    #[test]
    fn empty_completion_becomes_a_finish() {
        let r = split_response("   ", "");
        assert_eq!(r.action, EMPTY_RESPONSE_ACTION);
        assert!(r.thinking.is_empty());
    }
}
